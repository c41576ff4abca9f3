//! Core block components
//!
//! This module contains the block codec and its collaborators:
//! - Block header model (fixed 80-byte layout)
//! - Blocks (raw decoding, deferred transaction parsing, serialization)
//! - Proof-of-work and version-bit metrics
//! - Transaction codec (legacy and segwit)
//! - Network configuration

pub mod block;
pub mod header;
pub mod metrics;
pub mod network;
pub mod transaction;

pub use block::{Block, BlockBuilder, BlockError, BlockSummary, ParseOptions};
pub use header::{BlockHeader, HeaderWord, Word32, BLOCK_HEADER_SIZE};
pub use metrics::{
    bits_to_target, difficulty, difficulty_from_bits, hash_meets_bits, hash_meets_target,
    target_to_hex, version_bits_string,
    version_features, Bip, VersionBits, BIP9_START_HEIGHT, MAX_TARGET_BITS,
    VERSION_ROLLING_HEIGHT,
};
pub use network::{Network, NetworkError};
pub use transaction::{
    Transaction, TransactionError, TransactionInput, TransactionOutput, TransactionSummary,
    TxRef, COINBASE_OUTPUT_INDEX, SEQUENCE_FINAL,
};
