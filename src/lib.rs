//! Block-Codec: Bitcoin block decoding, encoding and proof-of-work metrics
//!
//! This crate provides:
//! - Exact raw block deserialization and serialization (80-byte header,
//!   varint transaction count, legacy and segwit transactions)
//! - Lazy transaction parsing over the retained transaction bytes
//! - BIP34 height extraction from the coinbase
//! - Target, difficulty and proof-of-work checks from compact bits
//! - BIP9 and legacy version-bit feature decoding
//!
//! # Example
//!
//! ```rust
//! use block_codec::core::{Block, ParseOptions};
//!
//! let genesis = "0100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d1dac2b7c0101000000010000000000000000000000000000000000000000000000000000000000000000ffffffff4d04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c6f757420666f722062616e6b73ffffffff0100f2052a01000000434104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5fac00000000";
//!
//! let block = Block::from_hex(genesis, ParseOptions::default()).unwrap();
//! assert_eq!(block.difficulty(), 1.0);
//! assert!(block.check_proof_of_work());
//! println!("{}", block);
//! ```

pub mod cli;
pub mod core;
pub mod crypto;
pub mod encoding;

// Re-export commonly used types
pub use core::{
    Bip, Block, BlockBuilder, BlockError, BlockHeader, BlockSummary, HeaderWord, Network,
    ParseOptions, Transaction, TransactionError, TxRef,
};
