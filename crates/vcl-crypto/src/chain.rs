use vcl_types::Block;

use crate::hasher::{block_hash, hashes_match};

/// Recompute a block's hash from its own recorded fields.
pub fn recompute_block_hash(block: &Block) -> String {
    block_hash(
        block.block_number,
        block.timestamp,
        &block.payload_hash,
        &block.previous_hash,
        block.nonce,
    )
}

/// Hash chain integrity verifier.
///
/// Verifies that an ascending run of blocks forms a valid chain:
/// genesis is untouched, block numbers are dense, each block's
/// `previous_hash` matches its predecessor's `hash`, and each non-genesis
/// block's hash recomputes from its fields.
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Verify a full chain, ordered ascending from genesis.
    ///
    /// Returns the number of blocks checked. The first fault short-circuits.
    pub fn verify_chain(blocks: &[Block]) -> Result<u64, ChainError> {
        let Some(first) = blocks.first() else {
            return Ok(0);
        };

        if !first.is_genesis() {
            return Err(ChainError::MissingGenesis {
                found: first.block_number,
            });
        }
        if !first.matches_genesis() {
            return Err(ChainError::GenesisAltered);
        }

        for pair in blocks.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            Self::verify_link(current, previous)?;
            Self::verify_block_hash(current)?;
        }

        Ok(blocks.len() as u64)
    }

    /// Check that `current` directly follows `previous`.
    pub fn verify_link(current: &Block, previous: &Block) -> Result<(), ChainError> {
        let expected = previous.block_number.saturating_add(1);
        if current.block_number != expected {
            return Err(ChainError::Gap {
                expected,
                found: current.block_number,
            });
        }
        if !hashes_match(&current.previous_hash, &previous.hash) {
            return Err(ChainError::BrokenLink {
                block_number: current.block_number,
            });
        }
        Ok(())
    }

    /// Check that a block's stored hash matches its recomputed hash.
    pub fn verify_block_hash(block: &Block) -> Result<(), ChainError> {
        if block.is_genesis() {
            return if block.matches_genesis() {
                Ok(())
            } else {
                Err(ChainError::GenesisAltered)
            };
        }
        if !hashes_match(&recompute_block_hash(block), &block.hash) {
            return Err(ChainError::HashMismatch {
                block_number: block.block_number,
            });
        }
        Ok(())
    }
}

/// Errors from chain verification.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("chain does not start at genesis (first block is {found})")]
    MissingGenesis { found: u64 },

    #[error("genesis block differs from the published genesis values")]
    GenesisAltered,

    #[error("block numbering gap: expected {expected}, found {found}")]
    Gap { expected: u64, found: u64 },

    #[error("broken link at block {block_number}: previous hash does not match")]
    BrokenLink { block_number: u64 },

    #[error("hash mismatch at block {block_number}: computed hash differs from stored")]
    HashMismatch { block_number: u64 },
}

impl ChainError {
    /// Block number at which the fault was detected.
    pub fn block_number(&self) -> u64 {
        match self {
            Self::MissingGenesis { found } => *found,
            Self::GenesisAltered => 0,
            Self::Gap { found, .. } => *found,
            Self::BrokenLink { block_number } | Self::HashMismatch { block_number } => {
                *block_number
            }
        }
    }
}
