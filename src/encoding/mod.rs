//! Byte-level encoding helpers
//!
//! Hashes and header fields are stored in display order (the reverse of
//! their little-endian wire order), so most conversions here are about
//! flipping byte order and going to and from hex.

pub mod varint;

use thiserror::Error;

pub use varint::{
    decode_varint, encode_varint, read_varint, varint_size, write_varint, VarIntError,
    MAX_VARINT_SIZE,
};

/// Encoding errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("Expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("Varint error: {0}")]
    VarInt(#[from] VarIntError),
}

/// Copy of `data` with its byte order reversed
pub fn reversed<const N: usize>(data: &[u8; N]) -> [u8; N] {
    let mut out = *data;
    out.reverse();
    out
}

/// Copy a slice into a fixed-size array
pub fn to_array<const N: usize>(data: &[u8]) -> Result<[u8; N], EncodingError> {
    data.try_into().map_err(|_| EncodingError::InvalidLength {
        expected: N,
        actual: data.len(),
    })
}

/// Copy a wire-order slice into a fixed-size array in display order
pub fn wire_to_display<const N: usize>(data: &[u8]) -> Result<[u8; N], EncodingError> {
    to_array::<N>(data).map(|arr| reversed(&arr))
}

/// Parse a 32-byte hash from its hex form (display order)
pub fn hash_from_hex(s: &str) -> Result<[u8; 32], EncodingError> {
    let bytes = hex::decode(s.trim())?;
    to_array(&bytes)
}
