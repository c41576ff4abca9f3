//! Block-Codec CLI Application
//!
//! A command-line interface for decoding raw Bitcoin blocks.

use block_codec::cli::{self, BlockInput};
use block_codec::core::{Network, ParseOptions};
use block_codec::encoding::hash_from_hex;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blockcodec")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Decode, re-encode and measure raw Bitcoin blocks", long_about = None)]
struct Cli {
    /// Network the block belongs to (bitcoin, testnet, signet, regtest)
    #[arg(short, long, default_value = "bitcoin", global = true)]
    network: Network,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a raw block and print it as JSON
    Decode {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// Show target, difficulty, proof of work and version signaling
    Metrics {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// Check that a block re-serializes to identical bytes
    Roundtrip {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Raw block as hex
    #[arg(long, conflicts_with = "file")]
    hex: Option<String>,

    /// File with the raw block (hex text or binary)
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct ParseArgs {
    /// Decode all transactions, not only the coinbase
    #[arg(short, long)]
    parse_transactions: bool,

    /// Maximum number of transactions to decode (0 = all)
    #[arg(short, long, default_value = "0")]
    limit: usize,

    /// Expected block hash; decoding fails if it differs
    #[arg(long)]
    hash: Option<String>,

    /// Known block height; checked against the coinbase height
    #[arg(long)]
    height: Option<u64>,
}

impl SourceArgs {
    fn into_input(self) -> BlockInput {
        BlockInput {
            hex: self.hex,
            file: self.file,
        }
    }
}

impl ParseArgs {
    fn into_options(self, network: Network) -> Result<ParseOptions, Box<dyn std::error::Error>> {
        let hash = self.hash.as_deref().map(hash_from_hex).transpose()?;
        Ok(ParseOptions {
            hash,
            height: self.height,
            parse_transactions: self.parse_transactions,
            limit: self.limit,
            network,
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let network = cli.network;

    match cli.command {
        Commands::Decode { source, parse } => {
            cli::cmd_decode(&source.into_input(), parse.into_options(network)?)?;
        }

        Commands::Metrics { source, parse } => {
            cli::cmd_metrics(&source.into_input(), parse.into_options(network)?)?;
        }

        Commands::Roundtrip { source } => {
            let options = ParseOptions {
                network,
                ..Default::default()
            };
            cli::cmd_roundtrip(&source.into_input(), options)?;
        }
    }

    Ok(())
}
