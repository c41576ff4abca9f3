//! Cryptographic utilities
//!
//! This module provides the SHA-256 primitives behind block hashes
//! and transaction IDs.

pub mod hash;

pub use hash::{double_sha256, double_sha256_display, sha256, sha256_hex, HASH_SIZE};
