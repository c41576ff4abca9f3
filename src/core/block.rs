//! Block entity and raw block codec
//!
//! A block is an 80-byte header followed by a variable-length transaction
//! count and the concatenated transactions. Blocks can be built directly
//! from header values or decoded from raw bytes; in the latter case the
//! transactions may be decoded lazily from a retained byte tail.

use crate::core::header::{BlockHeader, HeaderWord, Word32, BLOCK_HEADER_SIZE};
use crate::core::metrics::{
    bits_to_target, difficulty_from_bits, hash_meets_bits, target_to_hex, version_bits_string,
    version_features, Bip,
};
use crate::core::network::Network;
use crate::core::transaction::{Transaction, TransactionError, TxRef};
use crate::crypto::double_sha256_display;
use crate::encoding::{decode_varint, varint_size, write_varint, EncodingError, VarIntError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Block Errors
// =============================================================================

/// Block construction and codec errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    #[error("Provided block hash {provided} does not correspond to calculated block hash {calculated}")]
    HashMismatch { provided: String, calculated: String },
    #[error("Specified block height {provided} is different than BIP34 coinbase height {calculated}")]
    HeightMismatch { provided: u64, calculated: u64 },
    #[error("Number of found transactions {parsed} is not equal to expected number {declared}")]
    TransactionCountMismatch { declared: u64, parsed: usize },
    #[error("Malformed block header: {0}")]
    MalformedHeader(String),
    #[error("Block contains {available} transactions but declares {declared:?}, can not serialize")]
    IncompleteTransactionList {
        declared: Option<u64>,
        available: usize,
    },
    #[error("Transaction {0} is only known by ID, can not serialize")]
    UnresolvedTransaction(String),
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Varint error: {0}")]
    VarInt(#[from] VarIntError),
}

// =============================================================================
// Parse Options
// =============================================================================

/// Options for decoding a raw block
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Expected block hash (display order); decoding fails on mismatch
    pub hash: Option<[u8; 32]>,
    /// Known block height; checked against the BIP34 coinbase height
    pub height: Option<u64>,
    /// Decode all transactions instead of only the coinbase
    pub parse_transactions: bool,
    /// Maximum number of transactions to decode eagerly, 0 for no limit
    pub limit: usize,
    /// Network the block belongs to
    pub network: Network,
}

// =============================================================================
// Block
// =============================================================================

/// A block in the blockchain
#[derive(Debug, Clone)]
pub struct Block {
    /// Block hash (display order), if known
    pub hash: Option<[u8; 32]>,
    /// Block header
    pub header: BlockHeader,
    /// Block height, supplied or inferred from the coinbase (BIP34)
    pub height: Option<u64>,
    /// Number of confirmations, supplied externally
    pub confirmations: Option<u64>,
    /// Declared number of transactions
    pub tx_count: Option<u64>,
    /// Transactions decoded so far, in block order
    pub transactions: Vec<TxRef>,
    /// Network the block belongs to
    pub network: Network,
    /// Transaction bytes not yet decoded
    pending: Bytes,
}

impl Block {
    /// Start building a block from header values
    pub fn builder() -> BlockBuilder {
        BlockBuilder::default()
    }

    /// Decode a full raw block
    ///
    /// The coinbase is always decoded so the BIP34 height can be read from
    /// it. Remaining transactions are decoded when
    /// [`ParseOptions::parse_transactions`] is set, otherwise they stay
    /// pending for [`Block::parse_transactions`].
    pub fn from_raw(raw: &[u8], options: ParseOptions) -> Result<Self, BlockError> {
        if raw.len() < BLOCK_HEADER_SIZE {
            return Err(BlockError::MalformedHeader(format!(
                "raw block is {} bytes, shorter than the {} byte header",
                raw.len(),
                BLOCK_HEADER_SIZE
            )));
        }

        let calculated = double_sha256_display(&raw[..BLOCK_HEADER_SIZE]);
        if let Some(provided) = options.hash {
            if provided != calculated {
                return Err(hash_mismatch(&provided, &calculated));
            }
        }

        let header = BlockHeader::from_wire(&raw[..BLOCK_HEADER_SIZE])?;
        let (tx_count, width) = decode_varint(&raw[BLOCK_HEADER_SIZE..])?;
        let mut pending = Bytes::copy_from_slice(&raw[BLOCK_HEADER_SIZE + width..]);

        let mut transactions = Vec::new();
        if tx_count > 0 || !pending.is_empty() {
            transactions.push(next_transaction(&mut pending, options.network)?);
        }

        if options.parse_transactions {
            while !pending.is_empty() {
                if options.limit != 0 && transactions.len() >= options.limit {
                    break;
                }
                transactions.push(next_transaction(&mut pending, options.network)?);
            }

            if options.limit == 0 && tx_count != transactions.len() as u64 {
                return Err(BlockError::TransactionCountMismatch {
                    declared: tx_count,
                    parsed: transactions.len(),
                });
            }
        }

        log::debug!(
            "Decoded block {}: {} of {} transactions, {} bytes pending",
            hex::encode(calculated),
            transactions.len(),
            tx_count,
            pending.len()
        );

        let mut block = Self::assemble(
            Some(calculated),
            header,
            transactions,
            options.height,
            options.network,
        )?;
        block.tx_count = Some(tx_count);
        block.pending = pending;
        Ok(block)
    }

    /// Decode a block from its hex representation
    pub fn from_hex(raw_hex: &str, options: ParseOptions) -> Result<Self, BlockError> {
        let raw = hex::decode(raw_hex.trim()).map_err(EncodingError::from)?;
        Self::from_raw(&raw, options)
    }

    // Shared tail of both construction paths: settles the hash and the height.
    fn assemble(
        hash: Option<[u8; 32]>,
        header: BlockHeader,
        transactions: Vec<TxRef>,
        height: Option<u64>,
        network: Network,
    ) -> Result<Self, BlockError> {
        let hash = match (hash, header.hash().ok()) {
            (Some(provided), Some(calculated)) if provided != calculated => {
                return Err(hash_mismatch(&provided, &calculated));
            }
            (provided, calculated) => calculated.or(provided),
        };

        let mut block = Self {
            hash,
            header,
            height,
            confirmations: None,
            tx_count: None,
            transactions,
            network,
            pending: Bytes::new(),
        };

        if let Some(calculated) = block.coinbase_height() {
            if let Some(provided) = height {
                if provided != calculated {
                    return Err(BlockError::HeightMismatch {
                        provided,
                        calculated,
                    });
                }
            }
            block.height = Some(calculated);
        }

        Ok(block)
    }

    /// Decode up to `limit` more transactions from the pending bytes (0 for
    /// all of them), returning how many were decoded
    pub fn parse_transactions(&mut self, limit: usize) -> Result<usize, BlockError> {
        let mut parsed = 0;
        while !self.pending.is_empty() && (limit == 0 || parsed < limit) {
            let tx = next_transaction(&mut self.pending, self.network)?;
            self.transactions.push(tx);
            parsed += 1;
        }
        log::debug!(
            "Parsed {} more transactions, {} bytes pending",
            parsed,
            self.pending.len()
        );
        Ok(parsed)
    }

    /// Transaction bytes not yet decoded
    pub fn remaining_transaction_bytes(&self) -> &[u8] {
        &self.pending
    }

    /// Whether every declared transaction has been decoded
    pub fn is_fully_parsed(&self) -> bool {
        self.pending.is_empty() && self.tx_count == Some(self.transactions.len() as u64)
    }

    /// Serialize into the raw block format
    ///
    /// Requires the transaction list to be complete and fully decoded.
    pub fn serialize(&self) -> Result<Vec<u8>, BlockError> {
        let available = self.transactions.len();
        if available == 0 || self.tx_count != Some(available as u64) {
            return Err(BlockError::IncompleteTransactionList {
                declared: self.tx_count,
                available,
            });
        }

        let header = self.header.to_wire()?;
        let mut out = BytesMut::with_capacity(BLOCK_HEADER_SIZE + varint_size(available as u64));
        out.put_slice(&header);
        write_varint(&mut out, available as u64);

        for entry in &self.transactions {
            match entry {
                TxRef::Full(tx) => out.put_slice(&tx.raw()),
                TxRef::Known(txid) => {
                    return Err(BlockError::UnresolvedTransaction(hex::encode(txid)));
                }
            }
        }

        Ok(out.to_vec())
    }

    /// Height embedded in the coinbase unlocking script (BIP34)
    ///
    /// Only version 2+ blocks carry it. The height is the 3 bytes after the
    /// push opcode, little-endian.
    pub fn coinbase_height(&self) -> Option<u64> {
        if self.version_int() <= 1 {
            return None;
        }
        let coinbase = self.coinbase_tx()?;
        let script = &coinbase.inputs.first()?.unlocking_script;
        if script.len() < 4 {
            return None;
        }
        Some(u32::from_le_bytes([script[1], script[2], script[3], 0]) as u64)
    }

    /// The coinbase transaction, if decoded
    pub fn coinbase_tx(&self) -> Option<&Transaction> {
        self.transactions
            .first()
            .and_then(TxRef::as_transaction)
            .filter(|tx| tx.is_coinbase())
    }

    /// Set the number of confirmations
    pub fn set_confirmations(&mut self, confirmations: u64) {
        self.confirmations = Some(confirmations);
    }

    pub fn version_int(&self) -> u32 {
        self.header.version_int()
    }

    pub fn bits_int(&self) -> u32 {
        self.header.bits_int()
    }

    pub fn nonce_int(&self) -> u32 {
        self.header.nonce_int()
    }

    /// Block timestamp as a UTC datetime
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.header
            .timestamp
            .and_then(|ts| DateTime::from_timestamp(ts as i64, 0))
    }

    /// Block hash as hex (empty if unknown)
    pub fn hash_hex(&self) -> String {
        self.hash.map(hex::encode).unwrap_or_default()
    }

    /// Whether this is the genesis block of its network
    pub fn is_genesis(&self) -> bool {
        self.hash.is_some_and(|hash| self.network.is_genesis(&hash))
    }

    // =========================================================================
    // Proof of work and version metrics
    // =========================================================================

    /// Target decoded from bits (zero when bits are absent)
    pub fn target(&self) -> BigUint {
        self.header
            .bits
            .map(|bits| bits_to_target(bits.value()))
            .unwrap_or_default()
    }

    /// Target as 64 hex characters (empty when bits are absent)
    pub fn target_hex(&self) -> String {
        match self.header.bits {
            Some(_) => target_to_hex(&self.target()),
            None => String::new(),
        }
    }

    /// Difficulty relative to the genesis target
    pub fn difficulty(&self) -> f64 {
        match self.header.bits {
            Some(bits) => difficulty_from_bits(bits.value()),
            None => 0.0,
        }
    }

    /// Whether the block hash is below its target
    ///
    /// Returns false when either the hash or the bits are unknown.
    pub fn check_proof_of_work(&self) -> bool {
        match (&self.hash, self.header.bits) {
            (Some(hash), Some(bits)) => hash_meets_bits(hash, bits.value()),
            _ => false,
        }
    }

    /// Version as a 32-character binary string
    pub fn version_bits(&self) -> String {
        version_bits_string(self.version_int())
    }

    /// Protocol features signaled by the block version
    pub fn version_features(&self) -> Vec<Bip> {
        version_features(self.version_int(), self.height)
    }

    /// Mapping form of the block
    pub fn summary(&self) -> BlockSummary {
        BlockSummary {
            block_hash: self.hash.map(hex::encode),
            height: self.height,
            version: self.version_int(),
            prev_block: self.header.prev_block.map(hex::encode),
            merkle_root: self.header.merkle_root.map(hex::encode),
            timestamp: self.header.timestamp,
            time: self.time().map(|t| t.to_rfc3339()),
            bits: self.bits_int(),
            nonce: self.nonce_int(),
            target: self.target_hex(),
            difficulty: self.difficulty(),
            tx_count: self.tx_count,
            transactions: self
                .transactions
                .iter()
                .map(|tx| hex::encode(tx.txid()))
                .collect(),
            confirmations: self.confirmations,
            network: self.network,
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let height = self
            .height
            .map(|h| h.to_string())
            .unwrap_or_else(|| "None".to_string());
        let count = self
            .tx_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "None".to_string());
        write!(
            f,
            "Block({}, {}, transactions: {})",
            self.hash_hex(),
            height,
            count
        )
    }
}

/// Mapping form of a block, for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct BlockSummary {
    pub block_hash: Option<String>,
    pub height: Option<u64>,
    pub version: u32,
    pub prev_block: Option<String>,
    pub merkle_root: Option<String>,
    pub timestamp: Option<u32>,
    pub time: Option<String>,
    pub bits: u32,
    pub nonce: u32,
    pub target: String,
    pub difficulty: f64,
    pub tx_count: Option<u64>,
    pub transactions: Vec<String>,
    pub confirmations: Option<u64>,
    pub network: Network,
}

// =============================================================================
// Block Builder
// =============================================================================

/// Builds a [`Block`] from header values
///
/// `version`, `bits` and `nonce` (and `timestamp`) accept either an integer
/// or 4 big-endian bytes. When every header field is set the hash is
/// derived from them, and a supplied hash must agree.
#[derive(Debug, Default)]
pub struct BlockBuilder {
    hash: Option<[u8; 32]>,
    version: Option<HeaderWord>,
    prev_block: Option<[u8; 32]>,
    merkle_root: Option<[u8; 32]>,
    timestamp: Option<HeaderWord>,
    bits: Option<HeaderWord>,
    nonce: Option<HeaderWord>,
    transactions: Vec<TxRef>,
    tx_count: Option<u64>,
    height: Option<u64>,
    confirmations: Option<u64>,
    network: Network,
}

impl BlockBuilder {
    /// Expected block hash (display order)
    pub fn hash(mut self, hash: [u8; 32]) -> Self {
        self.hash = Some(hash);
        self
    }

    pub fn version(mut self, version: impl Into<HeaderWord>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Previous block hash (display order)
    pub fn prev_block(mut self, prev_block: [u8; 32]) -> Self {
        self.prev_block = Some(prev_block);
        self
    }

    /// Merkle root (display order)
    pub fn merkle_root(mut self, merkle_root: [u8; 32]) -> Self {
        self.merkle_root = Some(merkle_root);
        self
    }

    pub fn timestamp(mut self, timestamp: impl Into<HeaderWord>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn bits(mut self, bits: impl Into<HeaderWord>) -> Self {
        self.bits = Some(bits.into());
        self
    }

    pub fn nonce(mut self, nonce: impl Into<HeaderWord>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Transactions (full or by ID), in block order
    pub fn transactions(mut self, transactions: Vec<TxRef>) -> Self {
        self.transactions = transactions;
        self
    }

    /// Declared transaction count; defaults to the number of transactions
    pub fn tx_count(mut self, tx_count: u64) -> Self {
        self.tx_count = Some(tx_count);
        self
    }

    pub fn height(mut self, height: u64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = Some(confirmations);
        self
    }

    pub fn network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// Validate and build the block
    pub fn build(self) -> Result<Block, BlockError> {
        let header = BlockHeader {
            version: normalize(self.version, "version")?,
            prev_block: self.prev_block,
            merkle_root: self.merkle_root,
            timestamp: normalize(self.timestamp, "timestamp")?.map(|w| w.value()),
            bits: normalize(self.bits, "bits")?,
            nonce: normalize(self.nonce, "nonce")?,
        };

        let tx_count = self.tx_count.or_else(|| {
            (!self.transactions.is_empty()).then_some(self.transactions.len() as u64)
        });

        let mut block = Block::assemble(
            self.hash,
            header,
            self.transactions,
            self.height,
            self.network,
        )?;
        block.tx_count = tx_count;
        block.confirmations = self.confirmations;
        Ok(block)
    }
}

fn normalize(word: Option<HeaderWord>, field: &str) -> Result<Option<Word32>, BlockError> {
    match word {
        Some(word) => word.normalize(field),
        None => Ok(None),
    }
}

fn hash_mismatch(provided: &[u8; 32], calculated: &[u8; 32]) -> BlockError {
    BlockError::HashMismatch {
        provided: hex::encode(provided),
        calculated: hex::encode(calculated),
    }
}

// Decode the next transaction from the front of `pending`, consuming
// exactly its serialized length.
fn next_transaction(pending: &mut Bytes, network: Network) -> Result<TxRef, BlockError> {
    let (tx, consumed) = Transaction::deserialize(pending, network, false)?;
    log::trace!("Decoded transaction {} ({} bytes)", tx.txid_hex(), consumed);
    pending.advance(consumed);
    Ok(TxRef::from(tx))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{TransactionInput, TransactionOutput};
    use crate::encoding::hash_from_hex;
    use num_traits::ToPrimitive;

    const GENESIS_RAW: &str = "0100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d1dac2b7c0101000000010000000000000000000000000000000000000000000000000000000000000000ffffffff4d04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c6f757420666f722062616e6b73ffffffff0100f2052a01000000434104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5fac00000000";
    const GENESIS_HASH: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";

    fn coinbase(height: u32) -> Transaction {
        let h = height.to_le_bytes();
        let script = vec![0x03, h[0], h[1], h[2], 0xde, 0xad, 0xbe, 0xef];
        Transaction::new(
            1,
            vec![TransactionInput::coinbase(script)],
            vec![TransactionOutput::new(625_000_000, vec![0x51])],
            0,
            Network::Regtest,
        )
    }

    fn spend(n: u8, segwit: bool) -> Transaction {
        let mut input = TransactionInput::new([n; 32], n as u32, vec![0x00, n]);
        if segwit {
            input = input.with_witnesses(vec![vec![n; 72], vec![0x02; 33]]);
        }
        Transaction::new(
            2,
            vec![input],
            vec![
                TransactionOutput::new(1_000 * n as u64, vec![0x76, 0xa9, n]),
                TransactionOutput::new(42, vec![0x6a]),
            ],
            0,
            Network::Regtest,
        )
    }

    fn synthetic_block(version: u32, height: u32) -> Block {
        let transactions = vec![
            TxRef::from(coinbase(height)),
            TxRef::from(spend(1, false)),
            TxRef::from(spend(2, true)),
            TxRef::from(spend(3, false)),
        ];
        Block::builder()
            .version(version)
            .prev_block([0x11; 32])
            .merkle_root([0x22; 32])
            .timestamp(1_600_000_000u32)
            .bits(0x207f_ffffu32)
            .nonce(7u32)
            .transactions(transactions)
            .network(Network::Regtest)
            .build()
            .unwrap()
    }

    fn regtest(parse_transactions: bool) -> ParseOptions {
        ParseOptions {
            parse_transactions,
            network: Network::Regtest,
            ..Default::default()
        }
    }

    fn documented_block() -> Result<Block, BlockError> {
        Block::builder()
            .hash(hash_from_hex("0000000000000000000154ba9d02ddd6cee0d71d1ea232753e02c9ac6affd709").unwrap())
            .version(0x2000_0000u32)
            .prev_block(hash_from_hex("0000000000000000000f9578cda278ae7a2002e50d8e6079d11e2ea1f672b483").unwrap())
            .merkle_root(hash_from_hex("20e86f03c24c53c12014264d0e405e014e15a02ad02c174f017ee040750f8d9d").unwrap())
            .timestamp(1_592_848_036u32)
            .bits(387_044_594u32)
            .nonce(791_719_079u32)
            .build()
    }

    #[test]
    fn test_genesis_from_raw() {
        let raw = hex::decode(GENESIS_RAW).unwrap();
        let options = ParseOptions {
            parse_transactions: true,
            ..Default::default()
        };
        let block = Block::from_raw(&raw, options).unwrap();

        assert_eq!(block.hash_hex(), GENESIS_HASH);
        assert_eq!(block.version_int(), 1);
        assert_eq!(block.header.prev_block, Some([0u8; 32]));
        assert_eq!(
            block.header.merkle_root.map(hex::encode).unwrap(),
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
        );
        assert_eq!(block.header.timestamp, Some(1_231_006_505));
        assert_eq!(block.bits_int(), 0x1d00ffff);
        assert_eq!(block.nonce_int(), 2_083_236_893);
        assert_eq!(block.tx_count, Some(1));
        assert_eq!(block.height, None);
        assert_eq!(block.difficulty(), 1.0);
        assert!(block.check_proof_of_work());
        assert!(block.is_fully_parsed());
        assert_eq!(block.serialize().unwrap(), raw);
    }

    #[test]
    fn test_from_raw_with_expected_hash() {
        let options = ParseOptions {
            hash: Some(hash_from_hex(GENESIS_HASH).unwrap()),
            ..Default::default()
        };
        assert!(Block::from_hex(GENESIS_RAW, options).is_ok());

        let options = ParseOptions {
            hash: Some([0xAB; 32]),
            ..Default::default()
        };
        assert!(matches!(
            Block::from_hex(GENESIS_RAW, options),
            Err(BlockError::HashMismatch { calculated, .. }) if calculated == GENESIS_HASH
        ));
    }

    #[test]
    fn test_documented_header_proof_of_work() {
        let block = documented_block().unwrap();
        assert!(block.check_proof_of_work());
        assert_eq!(
            block.target_hex(),
            "00000000000000000011d4f20000000000000000000000000000000000000000"
        );
        assert_eq!(block.tx_count, None);
        assert_eq!(
            block.to_string(),
            "Block(0000000000000000000154ba9d02ddd6cee0d71d1ea232753e02c9ac6affd709, None, transactions: None)"
        );
    }

    #[test]
    fn test_builder_hash_mismatch() {
        let result = Block::builder()
            .hash([0x01; 32])
            .version(1u32)
            .prev_block([0; 32])
            .merkle_root([0; 32])
            .timestamp(0u32)
            .bits(0x1d00ffffu32)
            .nonce(0u32)
            .build();
        assert!(matches!(result, Err(BlockError::HashMismatch { .. })));
    }

    #[test]
    fn test_incomplete_header_keeps_supplied_hash() {
        let block = Block::builder()
            .hash([0x01; 32])
            .version(1u32)
            .build()
            .unwrap();
        assert_eq!(block.hash, Some([0x01; 32]));
        assert!(!block.check_proof_of_work());
        assert_eq!(block.target_hex(), "");
        assert_eq!(block.difficulty(), 0.0);
    }

    #[test]
    fn test_small_exponent_metrics() {
        let mut hash = [0u8; 32];
        hash[30..].copy_from_slice(&4660u16.to_be_bytes());
        let block = Block::builder()
            .hash(hash)
            .bits(0x0212_3456u32)
            .build()
            .unwrap();

        let max = bits_to_target(0x1d00_ffff).to_f64().unwrap();
        assert_eq!(block.difficulty(), max / 4660.2109375);
        assert!(block.check_proof_of_work());
        assert_eq!(block.target(), BigUint::from(0x1234u32));
    }

    #[test]
    fn test_byte_and_integer_fields_agree() {
        let from_ints = documented_block().unwrap();
        let from_bytes = Block::builder()
            .version([0x20, 0x00, 0x00, 0x00])
            .prev_block(from_ints.header.prev_block.unwrap())
            .merkle_root(from_ints.header.merkle_root.unwrap())
            .timestamp(1_592_848_036u32.to_be_bytes())
            .bits(387_044_594u32.to_be_bytes())
            .nonce(791_719_079u32.to_be_bytes())
            .build()
            .unwrap();

        assert_eq!(from_bytes.header, from_ints.header);
        assert_eq!(from_bytes.hash, from_ints.hash);

        let result = Block::builder().bits(vec![0x1d, 0x00]).build();
        assert!(matches!(result, Err(BlockError::MalformedHeader(_))));
    }

    #[test]
    fn test_round_trip_eager() {
        let raw = synthetic_block(0x2000_0000, 1_234).serialize().unwrap();
        let block = Block::from_raw(&raw, regtest(true)).unwrap();

        assert_eq!(block.transactions.len(), 4);
        assert_eq!(block.tx_count, Some(4));
        assert_eq!(block.height, Some(1_234));
        assert!(block.remaining_transaction_bytes().is_empty());
        assert_eq!(block.serialize().unwrap(), raw);
    }

    #[test]
    fn test_round_trip_three_byte_count() {
        let mut transactions = vec![TxRef::from(coinbase(300))];
        transactions.extend((1..=252u8).map(|n| TxRef::from(spend(n, n % 2 == 0))));
        let raw = Block::builder()
            .version(0x2000_0000u32)
            .prev_block([0x11; 32])
            .merkle_root([0x22; 32])
            .timestamp(1_600_000_000u32)
            .bits(0x207f_ffffu32)
            .nonce(7u32)
            .transactions(transactions)
            .network(Network::Regtest)
            .build()
            .unwrap()
            .serialize()
            .unwrap();

        assert_eq!(raw[BLOCK_HEADER_SIZE], 0xfd);
        assert_eq!(&raw[BLOCK_HEADER_SIZE + 1..BLOCK_HEADER_SIZE + 3], &253u16.to_le_bytes());

        let block = Block::from_raw(&raw, regtest(true)).unwrap();
        assert_eq!(block.transactions.len(), 253);
        assert_eq!(block.tx_count, Some(253));
        assert_eq!(block.height, Some(300));
        assert_eq!(block.serialize().unwrap(), raw);

        let mut deferred = Block::from_raw(&raw, regtest(false)).unwrap();
        assert_eq!(deferred.parse_transactions(0).unwrap(), 252);
        assert_eq!(deferred.serialize().unwrap(), raw);
    }

    #[test]
    fn test_deferred_parsing() {
        let raw = synthetic_block(0x2000_0000, 77).serialize().unwrap();
        let mut block = Block::from_raw(&raw, regtest(false)).unwrap();

        assert_eq!(block.transactions.len(), 1);
        assert_eq!(block.tx_count, Some(4));
        assert_eq!(block.height, Some(77));
        assert!(!block.remaining_transaction_bytes().is_empty());
        assert!(matches!(
            block.serialize(),
            Err(BlockError::IncompleteTransactionList {
                declared: Some(4),
                available: 1
            })
        ));

        assert_eq!(block.parse_transactions(2).unwrap(), 2);
        assert_eq!(block.transactions.len(), 3);
        assert_eq!(block.parse_transactions(0).unwrap(), 1);
        assert_eq!(block.parse_transactions(0).unwrap(), 0);
        assert!(block.is_fully_parsed());
        assert_eq!(block.serialize().unwrap(), raw);
    }

    #[test]
    fn test_parse_limit() {
        let raw = synthetic_block(0x2000_0000, 5).serialize().unwrap();
        let options = ParseOptions {
            limit: 2,
            ..regtest(true)
        };
        let block = Block::from_raw(&raw, options).unwrap();
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.tx_count, Some(4));
        assert!(!block.is_fully_parsed());
    }

    #[test]
    fn test_transaction_count_mismatch() {
        let mut raw = synthetic_block(0x2000_0000, 5).serialize().unwrap();
        raw[BLOCK_HEADER_SIZE] = 5;

        assert_eq!(
            Block::from_raw(&raw, regtest(true)).unwrap_err(),
            BlockError::TransactionCountMismatch {
                declared: 5,
                parsed: 4
            }
        );
        // A limit disables the count check
        let options = ParseOptions {
            limit: 10,
            ..regtest(true)
        };
        assert!(Block::from_raw(&raw, options).is_ok());
    }

    #[test]
    fn test_height_mismatch() {
        let raw = synthetic_block(0x2000_0000, 500).serialize().unwrap();

        let options = ParseOptions {
            height: Some(501),
            ..regtest(false)
        };
        assert_eq!(
            Block::from_raw(&raw, options).unwrap_err(),
            BlockError::HeightMismatch {
                provided: 501,
                calculated: 500
            }
        );

        let options = ParseOptions {
            height: Some(500),
            ..regtest(false)
        };
        let block = Block::from_raw(&raw, options).unwrap();
        assert_eq!(block.height, Some(500));
        assert_eq!(block.coinbase_height(), Some(500));
    }

    #[test]
    fn test_version_one_skips_bip34() {
        let raw = synthetic_block(1, 500).serialize().unwrap();
        let options = ParseOptions {
            height: Some(9),
            ..regtest(false)
        };
        let block = Block::from_raw(&raw, options).unwrap();
        assert_eq!(block.height, Some(9));
        assert_eq!(block.coinbase_height(), None);
    }

    #[test]
    fn test_serialize_requires_declared_count() {
        let block = Block::builder()
            .version(2u32)
            .prev_block([0; 32])
            .merkle_root([0; 32])
            .timestamp(0u32)
            .bits(0x207fffffu32)
            .nonce(0u32)
            .transactions(vec![TxRef::from(coinbase(1)), TxRef::from(spend(1, false))])
            .tx_count(3)
            .build()
            .unwrap();

        assert_eq!(
            block.serialize().unwrap_err(),
            BlockError::IncompleteTransactionList {
                declared: Some(3),
                available: 2
            }
        );
    }

    #[test]
    fn test_serialize_empty_block() {
        let block = Block::builder().version(2u32).build().unwrap();
        assert!(matches!(
            block.serialize(),
            Err(BlockError::IncompleteTransactionList { available: 0, .. })
        ));
    }

    #[test]
    fn test_serialize_missing_header_field() {
        let block = Block::builder()
            .version(2u32)
            .prev_block([0; 32])
            .merkle_root([0; 32])
            .timestamp(0u32)
            .bits(0x207fffffu32)
            .transactions(vec![TxRef::from(coinbase(1))])
            .build()
            .unwrap();

        assert_eq!(block.hash, None);
        assert!(matches!(
            block.serialize(),
            Err(BlockError::MalformedHeader(msg)) if msg.contains("nonce")
        ));
    }

    #[test]
    fn test_serialize_known_only_transaction() {
        let block = Block::builder()
            .version(2u32)
            .prev_block([0; 32])
            .merkle_root([0; 32])
            .timestamp(0u32)
            .bits(0x207fffffu32)
            .nonce(0u32)
            .transactions(vec![TxRef::from(coinbase(1)), TxRef::Known([0x33; 32])])
            .build()
            .unwrap();

        assert_eq!(
            block.serialize().unwrap_err(),
            BlockError::UnresolvedTransaction(hex::encode([0x33; 32]))
        );
    }

    #[test]
    fn test_truncated_raw_block() {
        let raw = hex::decode(GENESIS_RAW).unwrap();
        assert!(matches!(
            Block::from_raw(&raw[..60], ParseOptions::default()),
            Err(BlockError::MalformedHeader(_))
        ));
        assert!(matches!(
            Block::from_raw(&raw[..raw.len() - 10], ParseOptions::default()),
            Err(BlockError::Transaction(_))
        ));
    }

    #[test]
    fn test_header_only_block() {
        let raw = hex::decode(GENESIS_RAW).unwrap();
        let mut header_only = raw[..BLOCK_HEADER_SIZE].to_vec();
        header_only.push(0x00);

        let block = Block::from_raw(&header_only, ParseOptions::default()).unwrap();
        assert_eq!(block.tx_count, Some(0));
        assert!(block.transactions.is_empty());
        assert_eq!(block.hash_hex(), GENESIS_HASH);
    }

    #[test]
    fn test_version_metrics() {
        let mut block = synthetic_block(0x2000_0002, 450_001);
        assert_eq!(block.height, Some(450_001));
        assert!(block.version_bits().ends_with("10"));
        assert_eq!(block.version_bits().len(), 32);
        assert_eq!(block.version_features(), vec![Bip::Bip9, Bip::Bip141]);

        block.height = None;
        assert!(block.version_features().is_empty());
    }

    #[test]
    fn test_summary() {
        let raw = hex::decode(GENESIS_RAW).unwrap();
        let mut block = Block::from_raw(&raw, ParseOptions::default()).unwrap();
        block.set_confirmations(10);

        let summary = block.summary();
        assert_eq!(summary.block_hash.as_deref(), Some(GENESIS_HASH));
        assert_eq!(summary.bits, 0x1d00ffff);
        assert!(block.is_genesis());
        assert!(!synthetic_block(2, 1).is_genesis());
        assert_eq!(summary.difficulty, 1.0);
        assert_eq!(summary.time.as_deref(), Some("2009-01-03T18:15:05+00:00"));
        assert_eq!(summary.transactions.len(), 1);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["confirmations"], 10);
        assert_eq!(json["network"], "bitcoin");
        assert_eq!(json["tx_count"], 1);
    }
}
