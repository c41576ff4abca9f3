//! CLI commands for the block codec
//!
//! Implements all command handlers for the CLI interface.

use crate::core::{Block, ParseOptions};
use serde_json::json;
use std::fs;
use std::path::PathBuf;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Where to read a raw block from
#[derive(Debug, Clone, Default)]
pub struct BlockInput {
    /// Block as a hex string
    pub hex: Option<String>,
    /// File holding the block as hex text or raw bytes
    pub file: Option<PathBuf>,
}

/// Load raw block bytes from hex or a file
///
/// Files are read as hex text when they decode as such, otherwise as raw
/// binary.
pub fn load_raw_block(input: &BlockInput) -> CliResult<Vec<u8>> {
    if let Some(raw_hex) = &input.hex {
        return Ok(hex::decode(raw_hex.trim())?);
    }

    let path = input
        .file
        .as_ref()
        .ok_or("either --hex or --file must be given")?;
    let data = fs::read(path)?;
    log::debug!("Read {} bytes from {:?}", data.len(), path);

    let text = String::from_utf8_lossy(&data);
    match hex::decode(text.trim()) {
        Ok(raw) => Ok(raw),
        Err(_) => Ok(data),
    }
}

/// JSON view of a block, including decoded transactions
pub fn block_json(block: &Block) -> CliResult<String> {
    let transactions: Vec<_> = block
        .transactions
        .iter()
        .filter_map(|tx| tx.as_transaction())
        .map(|tx| tx.summary())
        .collect();

    let value = json!({
        "block": block.summary(),
        "genesis": block.is_genesis(),
        "decoded_transactions": transactions,
        "pending_bytes": block.remaining_transaction_bytes().len(),
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Whether a block re-serializes to exactly the input bytes
pub fn roundtrip_matches(raw: &[u8], options: ParseOptions) -> CliResult<bool> {
    let options = ParseOptions {
        parse_transactions: true,
        limit: 0,
        ..options
    };
    let block = Block::from_raw(raw, options)?;
    Ok(block.serialize()? == raw)
}

/// Decode a block and print it as JSON
pub fn cmd_decode(input: &BlockInput, options: ParseOptions) -> CliResult<()> {
    let raw = load_raw_block(input)?;
    let block = Block::from_raw(&raw, options)?;
    log::info!("Decoded {}", block);

    println!("{}", block_json(&block)?);
    Ok(())
}

/// Print proof-of-work and version signaling metrics
pub fn cmd_metrics(input: &BlockInput, options: ParseOptions) -> CliResult<()> {
    let raw = load_raw_block(input)?;
    let block = Block::from_raw(&raw, options)?;

    let features: Vec<String> = block
        .version_features()
        .iter()
        .map(|bip| bip.to_string())
        .collect();

    println!("🧱 Block {}", block.hash_hex());
    if block.is_genesis() {
        println!("   ├─ Genesis block of {}", block.network);
    }
    match block.height {
        Some(height) => println!("   ├─ Height: {}", height),
        None => println!("   ├─ Height: unknown"),
    }
    println!("   ├─ Target: {}", block.target_hex());
    println!("   ├─ Difficulty: {}", block.difficulty());
    println!(
        "   ├─ Proof of work: {}",
        if block.check_proof_of_work() {
            "✅ valid"
        } else {
            "❌ not proven"
        }
    );
    println!("   ├─ Version: {:#010x}", block.version_int());
    println!("   ├─ Version bits: {}", block.version_bits());
    if features.is_empty() {
        println!("   └─ Signaled features: none");
    } else {
        println!("   └─ Signaled features: {}", features.join(", "));
    }

    Ok(())
}

/// Decode and re-serialize a block, reporting whether the bytes match
pub fn cmd_roundtrip(input: &BlockInput, options: ParseOptions) -> CliResult<()> {
    let raw = load_raw_block(input)?;
    if roundtrip_matches(&raw, options)? {
        println!("✅ Round trip identical ({} bytes)", raw.len());
        Ok(())
    } else {
        Err("re-serialized block differs from input".into())
    }
}
