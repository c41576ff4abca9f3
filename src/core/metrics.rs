//! Proof-of-work and version signaling metrics
//!
//! Targets are decoded from the compact `bits` encoding into arbitrary
//! precision integers, since a malformed exponent can describe numbers far
//! wider than 256 bits.

use bitflags::bitflags;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::Serialize;
use std::fmt;

// =============================================================================
// Constants
// =============================================================================

/// Bits of the difficulty-1 target (the genesis block target)
pub const MAX_TARGET_BITS: u32 = 0x1d00ffff;

/// Top three version bits that mark BIP9 signaling
pub const BIP9_TOP_BITS: u32 = 0b001;

/// First height at which BIP9 signaling is recognized
pub const BIP9_START_HEIGHT: u64 = 407_021;

/// First height at which version rolling (BIP310) is recognized, and the
/// height below which legacy integer versions are matched
pub const VERSION_ROLLING_HEIGHT: u64 = 500_000;

bitflags! {
    /// Signaling bits inside a BIP9 block version
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VersionBits: u32 {
        /// CSV deployment (BIP68, BIP112, BIP113)
        const CSV = 1 << 0;
        /// Segwit deployment (BIP141, BIP143, BIP147)
        const SEGWIT = 1 << 1;
        /// Segwit signaling (BIP91)
        const SEGSIGNAL = 1 << 4;
        /// Bits miners may roll freely (BIP310)
        const VERSION_ROLLING = 0x1fff_e000;
    }
}

/// A protocol feature signaled by a block version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Bip {
    #[serde(rename = "BIP9")]
    Bip9,
    #[serde(rename = "BIP68")]
    Bip68,
    #[serde(rename = "BIP141")]
    Bip141,
    #[serde(rename = "BIP91")]
    Bip91,
    #[serde(rename = "BIP109")]
    Bip109,
    #[serde(rename = "BIP310")]
    Bip310,
    #[serde(rename = "BIP34")]
    Bip34,
    #[serde(rename = "BIP66")]
    Bip66,
    #[serde(rename = "BIP65")]
    Bip65,
    #[serde(rename = "BIP101")]
    Bip101,
}

impl Bip {
    pub fn name(&self) -> &'static str {
        match self {
            Bip::Bip9 => "BIP9",
            Bip::Bip68 => "BIP68",
            Bip::Bip141 => "BIP141",
            Bip::Bip91 => "BIP91",
            Bip::Bip109 => "BIP109",
            Bip::Bip310 => "BIP310",
            Bip::Bip34 => "BIP34",
            Bip::Bip66 => "BIP66",
            Bip::Bip65 => "BIP65",
            Bip::Bip101 => "BIP101",
        }
    }
}

impl fmt::Display for Bip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Target and difficulty
// =============================================================================

/// Decode compact bits into the full target
///
/// The high byte is the exponent and the low three bytes the coefficient:
/// `target = coefficient * 256^(exponent - 3)`. Exponents below 3 shift
/// the coefficient right.
pub fn bits_to_target(bits: u32) -> BigUint {
    let exponent = bits >> 24;
    let coefficient = BigUint::from(bits & 0x00ff_ffff);

    if exponent >= 3 {
        coefficient << (8 * (exponent - 3))
    } else {
        coefficient >> (8 * (3 - exponent))
    }
}

/// Target as lowercase hex, zero-padded to 64 characters
pub fn target_to_hex(target: &BigUint) -> String {
    format!("{:064x}", target)
}

/// Difficulty relative to the difficulty-1 target
///
/// A zero target has no meaningful difficulty and yields 0.0.
pub fn difficulty(target: &BigUint) -> f64 {
    if target.is_zero() {
        return 0.0;
    }
    let max = bits_to_target(MAX_TARGET_BITS).to_f64().unwrap_or(f64::INFINITY);
    let target = target.to_f64().unwrap_or(f64::INFINITY);
    max / target
}

/// Whether a display-order hash, read as a big-endian integer, is strictly
/// below `target`
pub fn hash_meets_target(hash: &[u8; 32], target: &BigUint) -> bool {
    BigUint::from_bytes_be(hash) < *target
}

/// Difficulty for compact `bits`, without truncating small exponents
///
/// For an exponent below 3 the target `coefficient / 256^(3 - exponent)` is
/// fractional; it is evaluated in floating point instead of being floored.
pub fn difficulty_from_bits(bits: u32) -> f64 {
    let exponent = bits >> 24;
    if exponent >= 3 {
        return difficulty(&bits_to_target(bits));
    }

    let coefficient = bits & 0x00ff_ffff;
    if coefficient == 0 {
        return 0.0;
    }
    let max = bits_to_target(MAX_TARGET_BITS).to_f64().unwrap_or(f64::INFINITY);
    let target = coefficient as f64 / 256f64.powi((3 - exponent) as i32);
    max / target
}

/// Whether a display-order hash is strictly below the target of `bits`
///
/// Small exponents are compared exactly: `hash < coefficient / 256^k` is
/// checked as `hash * 256^k < coefficient`.
pub fn hash_meets_bits(hash: &[u8; 32], bits: u32) -> bool {
    let exponent = bits >> 24;
    if exponent >= 3 {
        return hash_meets_target(hash, &bits_to_target(bits));
    }

    let scaled = BigUint::from_bytes_be(hash) << (8 * (3 - exponent));
    scaled < BigUint::from(bits & 0x00ff_ffff)
}

// =============================================================================
// Version signaling
// =============================================================================

/// Version as a 32-character binary string, most significant bit first
pub fn version_bits_string(version: u32) -> String {
    format!("{:032b}", version)
}

/// Features signaled by `version` at `height`
///
/// Features come out in adoption order. Without a height neither the BIP9
/// nor the legacy rules apply and the list is empty.
pub fn version_features(version: u32, height: Option<u64>) -> Vec<Bip> {
    let Some(height) = height else {
        return Vec::new();
    };

    let mut bips = Vec::new();
    if version >> 29 == BIP9_TOP_BITS && height >= BIP9_START_HEIGHT {
        let bits = VersionBits::from_bits_retain(version);
        bips.push(Bip::Bip9);
        if bits.contains(VersionBits::CSV) {
            bips.push(Bip::Bip68);
        }
        if bits.contains(VersionBits::SEGWIT) {
            bips.push(Bip::Bip141);
        }
        if bits.contains(VersionBits::SEGSIGNAL) {
            bips.push(Bip::Bip91);
        }
        if version == 0x3000_0000 {
            bips.push(Bip::Bip109);
        }
        if bits.intersects(VersionBits::VERSION_ROLLING) && height >= VERSION_ROLLING_HEIGHT {
            bips.push(Bip::Bip310);
        }
    } else if height < VERSION_ROLLING_HEIGHT {
        match version {
            2 => bips.push(Bip::Bip34),
            3 => bips.push(Bip::Bip66),
            4 => bips.push(Bip::Bip65),
            0x3000_0000 => bips.push(Bip::Bip109),
            0x2000_0007 => bips.push(Bip::Bip101),
            _ => {}
        }
    }
    bips
}
