use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vcl",
    about = "Video Certification Ledger: tamper-evident certificates for recorded footage",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Ledger directory
    #[arg(long, global = true, default_value = ".vcl")]
    pub root: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the ledger directory and its genesis block
    Init(InitArgs),
    /// Certify a recording
    Issue(IssueArgs),
    /// Verify a certificate, optionally against a recording
    Verify(VerifyArgs),
    /// Verify the integrity of the whole chain
    VerifyChain(VerifyChainArgs),
    /// List certificates issued for a camera
    List(ListArgs),
    /// Print the SHA-256 of a file
    Hash(HashArgs),
    /// Start the VCL HTTP server
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct InitArgs {}

#[derive(Args)]
pub struct IssueArgs {
    /// Camera identifier
    #[arg(long)]
    pub camera: String,
    #[arg(long, default_value = "")]
    pub location: String,
    /// Recording file to hash
    #[arg(long, conflicts_with = "video_hash", required_unless_present = "video_hash")]
    pub file: Option<PathBuf>,
    /// Precomputed hex SHA-256 of the recording
    #[arg(long)]
    pub video_hash: Option<String>,
    /// Metadata entry as key=value (repeatable)
    #[arg(long = "meta", value_parser = parse_key_value)]
    pub metadata: Vec<(String, String)>,
    /// Hex Ed25519 secret used to seal the certificate
    #[arg(long)]
    pub issuer_key: Option<String>,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub id: String,
    /// Recording file to compare with the certified hash
    #[arg(long, conflicts_with = "video_hash")]
    pub file: Option<PathBuf>,
    #[arg(long)]
    pub video_hash: Option<String>,
    /// Hex Ed25519 public key whose seal is required
    #[arg(long)]
    pub trusted_issuer: Option<String>,
}

#[derive(Args)]
pub struct VerifyChainArgs {}

#[derive(Args)]
pub struct ListArgs {
    pub camera: String,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct HashArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long, default_value = "vcl.toml")]
    pub config: PathBuf,
    #[arg(long)]
    pub bind: Option<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init_with_root() {
        let cli = Cli::try_parse_from(["vcl", "init", "--root", "/tmp/ledger"]).unwrap();
        assert!(matches!(cli.command, Command::Init(_)));
        assert_eq!(cli.root, PathBuf::from("/tmp/ledger"));
    }

    #[test]
    fn parse_issue_with_metadata() {
        let cli = Cli::try_parse_from([
            "vcl",
            "issue",
            "--camera",
            "CAM-1",
            "--video-hash",
            "ab",
            "--meta",
            "operator=amina",
            "--meta",
            "duration=30",
        ])
        .unwrap();
        if let Command::Issue(args) = cli.command {
            assert_eq!(args.camera, "CAM-1");
            assert_eq!(args.video_hash.as_deref(), Some("ab"));
            assert_eq!(
                args.metadata,
                vec![
                    ("operator".to_string(), "amina".to_string()),
                    ("duration".to_string(), "30".to_string())
                ]
            );
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn issue_needs_a_recording() {
        assert!(Cli::try_parse_from(["vcl", "issue", "--camera", "CAM-1"]).is_err());
        assert!(Cli::try_parse_from([
            "vcl", "issue", "--camera", "CAM-1", "--file", "a.mp4", "--video-hash", "ab"
        ])
        .is_err());
    }

    #[test]
    fn bad_metadata_is_rejected() {
        assert!(Cli::try_parse_from([
            "vcl", "issue", "--camera", "C", "--video-hash", "ab", "--meta", "novalue"
        ])
        .is_err());
    }

    #[test]
    fn parse_verify_chain_json() {
        let cli = Cli::try_parse_from(["vcl", "verify-chain", "--format", "json"]).unwrap();
        assert!(matches!(cli.command, Command::VerifyChain(_)));
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
