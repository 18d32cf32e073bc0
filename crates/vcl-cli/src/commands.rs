use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use vcl_crypto::{sha256_reader, short_hash, SigningKey, VerifyingKey};
use vcl_ledger::{ChainReport, IssueRequest, Ledger, LedgerConfig};
use vcl_server::{ServerConfig, VclServer};
use vcl_store::StoreConfig;
use vcl_types::{temporal, Certificate, VerificationResult, VerificationStatus};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Init(_) => cmd_init(&cli.root, format).await,
        Command::Issue(args) => cmd_issue(&cli.root, args, format).await,
        Command::Verify(args) => cmd_verify(&cli.root, args, format).await,
        Command::VerifyChain(_) => cmd_verify_chain(&cli.root, format).await,
        Command::List(args) => cmd_list(&cli.root, args, format).await,
        Command::Hash(args) => cmd_hash(args, format),
        Command::Serve(args) => cmd_serve(args).await,
    }
}

async fn open_ledger(root: &Path) -> anyhow::Result<Ledger> {
    Ledger::open(&StoreConfig::filesystem(root), LedgerConfig::default())
        .await
        .with_context(|| format!("opening ledger at {}", root.display()))
}

fn hash_file(path: &Path) -> anyhow::Result<String> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    sha256_reader(BufReader::new(file)).with_context(|| format!("reading {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn colored_status(status: VerificationStatus) -> colored::ColoredString {
    match status {
        VerificationStatus::Authentic => status.as_str().green().bold(),
        VerificationStatus::Pending => status.as_str().yellow(),
        VerificationStatus::NotFound => status.as_str().yellow().bold(),
        VerificationStatus::Tampered | VerificationStatus::ChainBroken => {
            status.as_str().red().bold()
        }
    }
}

async fn cmd_init(root: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let ledger = open_ledger(root).await?;
    let genesis = ledger
        .block(0)
        .await?
        .context("genesis block missing after initialization")?;
    match format {
        OutputFormat::Json => print_json(&genesis),
        OutputFormat::Text => {
            println!("{} Initialized ledger in {}", "✓".green().bold(), root.display().to_string().bold());
            println!("  Genesis: {}", genesis.hash.cyan());
            Ok(())
        }
    }
}

async fn cmd_issue(root: &Path, args: IssueArgs, format: OutputFormat) -> anyhow::Result<()> {
    let video_hash = match (&args.file, args.video_hash) {
        (Some(path), _) => hash_file(path)?,
        (None, Some(hash)) => hash,
        (None, None) => bail!("either --file or --video-hash is required"),
    };

    let mut request = IssueRequest::new(args.camera, args.location, video_hash);
    if let Some(path) = &args.file {
        request = request.with_metadata("fileName", path.display().to_string());
    }
    for (key, value) in args.metadata {
        request = request.with_metadata(key, value);
    }

    let mut ledger = open_ledger(root).await?;
    if let Some(hex) = args.issuer_key {
        ledger = ledger.with_signer(SigningKey::from_hex(&hex).context("parsing --issuer-key")?);
    }
    let certificate = ledger.issue(request).await?;

    match format {
        OutputFormat::Json => print_json(&certificate),
        OutputFormat::Text => {
            println!("{} Certificate issued", "✓".green().bold());
            print_certificate(&certificate);
            Ok(())
        }
    }
}

fn print_certificate(certificate: &Certificate) {
    println!("  Id: {}", certificate.id.yellow().bold());
    println!("  Camera: {} ({})", certificate.camera_id.bold(), certificate.camera_location);
    println!("  Issued: {}", certificate.issued_at_display());
    println!("  Video hash: {}", certificate.video_hash.cyan());
    println!(
        "  Block: #{}  previous {}",
        certificate.block_number,
        short_hash(&certificate.previous_block_hash, 8).dimmed()
    );
    for (key, value) in &certificate.metadata {
        println!("  {key}: {value}");
    }
}

async fn cmd_verify(root: &Path, args: VerifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let presented = match (&args.file, args.video_hash) {
        (Some(path), _) => Some(hash_file(path)?),
        (None, hash) => hash,
    };

    let mut ledger = open_ledger(root).await?;
    if let Some(hex) = args.trusted_issuer {
        ledger = ledger
            .with_trusted_issuer(VerifyingKey::from_hex(&hex).context("parsing --trusted-issuer")?);
    }
    let result = match presented {
        Some(hash) => ledger.verify_recording(&args.id, &hash).await?,
        None => ledger.verify_certificate(&args.id).await?,
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => print_verification(&result),
    }
    if !result.is_valid() {
        bail!("certificate {} is {}", args.id, result.status);
    }
    Ok(())
}

fn print_verification(result: &VerificationResult) {
    println!("{} {}", colored_status(result.status), result.message);
    if let Some(certificate) = &result.certificate {
        print_certificate(certificate);
    }
    println!("  Checked: {}", temporal::format_display(result.verified_at).dimmed());
}

async fn cmd_verify_chain(root: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let ledger = open_ledger(root).await?;
    let report = ledger.verify_chain().await?;
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_chain_report(&report),
    }
    if let Some(block) = report.broken_at() {
        bail!("chain integrity fault at block {block}");
    }
    Ok(())
}

fn print_chain_report(report: &ChainReport) {
    match &report.fault {
        None => {
            println!("{} Chain integrity verified", "✓".green().bold());
            println!("  Blocks: {}", report.block_count);
            if !report.pending_blocks.is_empty() {
                println!(
                    "  {} awaiting certificate: {:?}",
                    colored_status(report.status),
                    report.pending_blocks
                );
            }
        }
        Some(fault) => {
            println!(
                "{} {} at block {}",
                "✗".red().bold(),
                colored_status(report.status),
                fault.block_number
            );
            println!("  {}", fault.description);
        }
    }
}

async fn cmd_list(root: &Path, args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ledger = open_ledger(root).await?;
    let mut certificates = ledger.certificates_by_camera(&args.camera).await?;
    certificates.truncate(args.limit);

    match format {
        OutputFormat::Json => print_json(&certificates),
        OutputFormat::Text => {
            if certificates.is_empty() {
                println!("No certificates for camera {}.", args.camera.bold());
            }
            for c in &certificates {
                println!(
                    "{}  {}  #{}  {}",
                    c.id.yellow(),
                    c.issued_at_display(),
                    c.block_number,
                    short_hash(&c.video_hash, 8).dimmed()
                );
            }
            Ok(())
        }
    }
}

fn cmd_hash(args: HashArgs, format: OutputFormat) -> anyhow::Result<()> {
    let hash = hash_file(&args.file)?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "file": args.file.display().to_string(),
            "sha256": hash,
        })),
        OutputFormat::Text => {
            println!("{hash}  {}", args.file.display());
            Ok(())
        }
    }
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = ServerConfig::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind.parse().context("parsing --bind")?;
    }
    VclServer::new(config).serve().await?;
    Ok(())
}
