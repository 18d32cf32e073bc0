use tracing::warn;
use vcl_types::{Block, Certificate, Document};

/// Decode the block document stored under `block_number`, logging any
/// field that fell back to a default.
///
/// A block is always reported at the number it is stored under. A document
/// whose own `blockNumber` disagrees keeps the rest of its content, so the
/// hash check on that block fails instead of the block shadowing another.
pub(crate) fn block_from_document(block_number: u64, document: &Document) -> Block {
    let decoded = Block::decode(document);
    if !decoded.is_clean() {
        warn!(block = block_number, fields = ?decoded.defaulted, "block document decoded with defaults");
    }
    let mut block = decoded.into_inner();
    if block.block_number != block_number {
        warn!(
            block = block_number,
            recorded = block.block_number,
            "block document number disagrees with its key"
        );
        block.block_number = block_number;
    }
    block
}

/// Decode a certificate document, logging any field that fell back to a default.
pub(crate) fn certificate_from_document(key: &str, document: &Document) -> Certificate {
    let decoded = Certificate::decode(document);
    if !decoded.is_clean() {
        warn!(certificate = key, fields = ?decoded.defaulted, "certificate document decoded with defaults");
    }
    decoded.into_inner()
}

/// Newest first by issuance instant; block number breaks ties.
pub(crate) fn sort_newest_first(certificates: &mut [Certificate]) {
    certificates.sort_by(|a, b| {
        b.issued_at
            .cmp(&a.issued_at)
            .then(b.block_number.cmp(&a.block_number))
    });
}
