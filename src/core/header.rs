//! Block header model
//!
//! The 80-byte header is stored field by field in display order, which is
//! the byte-reverse of the little-endian wire layout:
//!
//! | Offset | Size | Field               |
//! |--------|------|---------------------|
//! | 0      | 4    | version             |
//! | 4      | 32   | previous block hash |
//! | 36     | 32   | merkle root         |
//! | 68     | 4    | timestamp           |
//! | 72     | 4    | bits                |
//! | 76     | 4    | nonce               |

use crate::core::block::BlockError;
use crate::crypto::double_sha256_display;
use crate::encoding::{to_array, wire_to_display};
use bytes::BufMut;

/// Block header size in bytes
pub const BLOCK_HEADER_SIZE: usize = 80;

/// A 32-bit header field as supplied by a caller, either as an integer
/// or as its 4-byte big-endian form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderWord {
    Int(u32),
    Bytes(Vec<u8>),
}

impl From<u32> for HeaderWord {
    fn from(value: u32) -> Self {
        HeaderWord::Int(value)
    }
}

impl From<[u8; 4]> for HeaderWord {
    fn from(bytes: [u8; 4]) -> Self {
        HeaderWord::Bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for HeaderWord {
    fn from(bytes: Vec<u8>) -> Self {
        HeaderWord::Bytes(bytes)
    }
}

impl From<&[u8]> for HeaderWord {
    fn from(bytes: &[u8]) -> Self {
        HeaderWord::Bytes(bytes.to_vec())
    }
}

impl HeaderWord {
    /// Normalize into both representations
    ///
    /// Empty byte input means the field is absent.
    pub fn normalize(self, field: &str) -> Result<Option<Word32>, BlockError> {
        match self {
            HeaderWord::Int(value) => Ok(Some(Word32::from_u32(value))),
            HeaderWord::Bytes(bytes) if bytes.is_empty() => Ok(None),
            HeaderWord::Bytes(bytes) => to_array::<4>(&bytes)
                .map(|arr| Some(Word32::from_bytes(arr)))
                .map_err(|e| BlockError::MalformedHeader(format!("{}: {}", field, e))),
        }
    }
}

/// A 32-bit header field held in its big-endian byte form and its integer form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Word32 {
    bytes: [u8; 4],
    value: u32,
}

impl Word32 {
    pub fn from_u32(value: u32) -> Self {
        Self {
            bytes: value.to_be_bytes(),
            value,
        }
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            bytes,
            value: u32::from_be_bytes(bytes),
        }
    }

    /// Big-endian (display order) bytes
    pub fn bytes(&self) -> [u8; 4] {
        self.bytes
    }

    pub fn value(&self) -> u32 {
        self.value
    }
}

/// Block header fields
///
/// Every field is optional so that partially known headers (for example
/// from an index that lacks the nonce) can still be represented. Packing
/// into wire form requires all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version
    pub version: Option<Word32>,
    /// Hash of the previous block (display order)
    pub prev_block: Option<[u8; 32]>,
    /// Merkle root of all transactions (display order)
    pub merkle_root: Option<[u8; 32]>,
    /// Block timestamp (Unix seconds)
    pub timestamp: Option<u32>,
    /// Compact difficulty target
    pub bits: Option<Word32>,
    /// Nonce used for proof of work
    pub nonce: Option<Word32>,
}

impl BlockHeader {
    /// Slice the header fields out of the first 80 bytes of `raw`
    pub fn from_wire(raw: &[u8]) -> Result<Self, BlockError> {
        if raw.len() < BLOCK_HEADER_SIZE {
            return Err(BlockError::MalformedHeader(format!(
                "need {} header bytes, got {}",
                BLOCK_HEADER_SIZE,
                raw.len()
            )));
        }

        Ok(Self {
            version: Some(Word32::from_bytes(wire_to_display(&raw[0..4])?)),
            prev_block: Some(wire_to_display(&raw[4..36])?),
            merkle_root: Some(wire_to_display(&raw[36..68])?),
            timestamp: Some(u32::from_be_bytes(wire_to_display(&raw[68..72])?)),
            bits: Some(Word32::from_bytes(wire_to_display(&raw[72..76])?)),
            nonce: Some(Word32::from_bytes(wire_to_display(&raw[76..80])?)),
        })
    }

    /// Pack into the 80-byte wire form
    pub fn to_wire(&self) -> Result<[u8; BLOCK_HEADER_SIZE], BlockError> {
        let mut out = Vec::with_capacity(BLOCK_HEADER_SIZE);
        put_reversed(&mut out, &required(self.version, "version")?.bytes());
        put_reversed(&mut out, &required(self.prev_block, "prev_block")?);
        put_reversed(&mut out, &required(self.merkle_root, "merkle_root")?);
        put_reversed(&mut out, &required(self.timestamp, "timestamp")?.to_be_bytes());
        put_reversed(&mut out, &required(self.bits, "bits")?.bytes());
        put_reversed(&mut out, &required(self.nonce, "nonce")?.bytes());

        out.as_slice().try_into().map_err(|_| {
            BlockError::MalformedHeader(format!(
                "packed header is {} bytes, expected {}",
                out.len(),
                BLOCK_HEADER_SIZE
            ))
        })
    }

    /// Whether every field is present
    pub fn is_complete(&self) -> bool {
        self.to_wire().is_ok()
    }

    /// Block hash in display order
    pub fn hash(&self) -> Result<[u8; 32], BlockError> {
        Ok(double_sha256_display(&self.to_wire()?))
    }

    /// Version as integer (0 when absent)
    pub fn version_int(&self) -> u32 {
        self.version.map(|w| w.value()).unwrap_or(0)
    }

    /// Bits as integer (0 when absent)
    pub fn bits_int(&self) -> u32 {
        self.bits.map(|w| w.value()).unwrap_or(0)
    }

    /// Nonce as integer (0 when absent)
    pub fn nonce_int(&self) -> u32 {
        self.nonce.map(|w| w.value()).unwrap_or(0)
    }
}

fn required<T>(field: Option<T>, name: &str) -> Result<T, BlockError> {
    field.ok_or_else(|| BlockError::MalformedHeader(format!("missing {}", name)))
}

fn put_reversed<B: BufMut>(out: &mut B, display: &[u8]) {
    for byte in display.iter().rev() {
        out.put_u8(*byte);
    }
}
