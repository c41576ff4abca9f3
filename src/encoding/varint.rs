//! Variable-length integers (Bitcoin CompactSize)
//!
//! | Value range            | Encoding                  |
//! |------------------------|---------------------------|
//! | `0..=0xFC`             | 1 byte                    |
//! | `0xFD..=0xFFFF`        | `0xFD` + u16 little-endian |
//! | `0x10000..=0xFFFFFFFF` | `0xFE` + u32 little-endian |
//! | larger                 | `0xFF` + u64 little-endian |

use bytes::{Buf, BufMut};
use thiserror::Error;

/// Maximum encoded width of a varint
pub const MAX_VARINT_SIZE: usize = 9;

/// Varint decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VarIntError {
    #[error("Unexpected end of data: need {needed} bytes, have {available}")]
    UnexpectedEnd { needed: usize, available: usize },
    #[error("Non-minimal varint encoding of {0}")]
    NonMinimal(u64),
}

/// Number of bytes `value` occupies once encoded
pub fn varint_size(value: u64) -> usize {
    match value {
        0..=0xFC => 1,
        0xFD..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

/// Append the encoding of `value` to `out`
pub fn write_varint<B: BufMut>(out: &mut B, value: u64) {
    match value {
        0..=0xFC => out.put_u8(value as u8),
        0xFD..=0xFFFF => {
            out.put_u8(0xFD);
            out.put_u16_le(value as u16);
        }
        0x1_0000..=0xFFFF_FFFF => {
            out.put_u8(0xFE);
            out.put_u32_le(value as u32);
        }
        _ => {
            out.put_u8(0xFF);
            out.put_u64_le(value);
        }
    }
}

/// Encode `value` into a fresh buffer
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(varint_size(value));
    write_varint(&mut out, value);
    out
}

/// Read a varint from the front of `buf`, advancing past it
pub fn read_varint<B: Buf>(buf: &mut B) -> Result<u64, VarIntError> {
    ensure_remaining(buf, 1)?;
    let prefix = buf.get_u8();
    let (value, min) = match prefix {
        0xFD => {
            ensure_remaining(buf, 2)?;
            (buf.get_u16_le() as u64, 0xFD)
        }
        0xFE => {
            ensure_remaining(buf, 4)?;
            (buf.get_u32_le() as u64, 0x1_0000)
        }
        0xFF => {
            ensure_remaining(buf, 8)?;
            (buf.get_u64_le(), 0x1_0000_0000)
        }
        n => return Ok(n as u64),
    };

    if value < min {
        return Err(VarIntError::NonMinimal(value));
    }
    Ok(value)
}

/// Decode a varint at the start of `data`, returning the value and its width
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize), VarIntError> {
    let mut buf = data;
    let value = read_varint(&mut buf)?;
    Ok((value, data.len() - buf.len()))
}

fn ensure_remaining<B: Buf>(buf: &B, needed: usize) -> Result<(), VarIntError> {
    if buf.remaining() < needed {
        return Err(VarIntError::UnexpectedEnd {
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}
