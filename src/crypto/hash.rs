//! Cryptographic hashing utilities for block and transaction identity
//!
//! Block hashes and transaction IDs are the double SHA-256 of their
//! serialized form. Digests come out in internal (wire) order; callers
//! reverse them for display.

use sha2::{Digest, Sha256};

/// Length of a SHA-256 digest in bytes
pub const HASH_SIZE: usize = 32;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes double SHA-256 hash (SHA-256 of SHA-256)
/// Used for block hashes and transaction IDs
pub fn double_sha256(data: &[u8]) -> [u8; HASH_SIZE] {
    sha256(&sha256(data))
}

/// Double SHA-256 reversed into display order
pub fn double_sha256_display(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut hash = double_sha256(data);
    hash.reverse();
    hash
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let data = b"hello world";
        assert_eq!(
            sha256_hex(data),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_double_sha256_empty() {
        assert_eq!(
            hex::encode(double_sha256(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn test_display_order_is_reversed() {
        let data = b"hello world";
        let mut wire = double_sha256(data);
        wire.reverse();
        assert_eq!(double_sha256_display(data), wire);
    }
}
