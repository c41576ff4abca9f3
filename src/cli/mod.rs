//! Command-line interface for the block codec

pub mod commands;

pub use commands::{
    block_json, cmd_decode, cmd_metrics, cmd_roundtrip, load_raw_block, roundtrip_matches,
    BlockInput, CliResult,
};
