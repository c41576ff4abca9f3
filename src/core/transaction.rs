//! Transaction codec
//!
//! Decodes and encodes Bitcoin transactions in their consensus wire
//! format, both legacy and segregated-witness (BIP144) layouts. Blocks
//! delegate to this codec for every transaction they contain, and rely
//! on [`Transaction::deserialize`] reporting exactly how many bytes each
//! transaction occupies.

use crate::core::network::Network;
use crate::crypto::double_sha256_display;
use crate::encoding::{read_varint, varint_size, write_varint, VarIntError};
use bytes::{Buf, BufMut};
use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Sequence number that disables locktime
pub const SEQUENCE_FINAL: u32 = 0xFFFFFFFF;

/// Output index referenced by a coinbase input
pub const COINBASE_OUTPUT_INDEX: u32 = 0xFFFFFFFF;

/// Marker byte that opens a segwit serialization
pub const SEGWIT_MARKER: u8 = 0x00;

/// Flag byte following the segwit marker
pub const SEGWIT_FLAG: u8 = 0x01;

// =============================================================================
// Error Types
// =============================================================================

/// Transaction decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Unexpected end of transaction data reading {field}: need {needed} bytes, have {available}")]
    UnexpectedEnd {
        field: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("Varint error: {0}")]
    VarInt(#[from] VarIntError),
    #[error("Invalid segwit flag: {0:#04x}")]
    InvalidSegwitFlag(u8),
    #[error("Transaction size mismatch: consumed {consumed} of {available} bytes")]
    SizeMismatch { consumed: usize, available: usize },
}

// =============================================================================
// Inputs and Outputs
// =============================================================================

/// Transaction input (reference to a previous output)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInput {
    /// Transaction ID of the previous transaction (display order)
    pub prev_txid: [u8; 32],
    /// Index of the output in the previous transaction
    pub output_index: u32,
    /// Unlocking script (scriptSig)
    pub unlocking_script: Vec<u8>,
    /// Sequence number
    pub sequence: u32,
    /// Witness stack items (empty for legacy inputs)
    pub witnesses: Vec<Vec<u8>>,
}

impl TransactionInput {
    /// Create an input spending `prev_txid:output_index`
    pub fn new(prev_txid: [u8; 32], output_index: u32, unlocking_script: Vec<u8>) -> Self {
        Self {
            prev_txid,
            output_index,
            unlocking_script,
            sequence: SEQUENCE_FINAL,
            witnesses: Vec::new(),
        }
    }

    /// Create a coinbase input carrying `unlocking_script` as miner data
    pub fn coinbase(unlocking_script: Vec<u8>) -> Self {
        Self::new([0u8; 32], COINBASE_OUTPUT_INDEX, unlocking_script)
    }

    /// Attach a witness stack
    pub fn with_witnesses(mut self, witnesses: Vec<Vec<u8>>) -> Self {
        self.witnesses = witnesses;
        self
    }

    /// Whether this input spends the null outpoint
    pub fn is_null_outpoint(&self) -> bool {
        self.prev_txid == [0u8; 32] && self.output_index == COINBASE_OUTPUT_INDEX
    }
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutput {
    /// Amount in satoshis
    pub value: u64,
    /// Locking script (scriptPubKey)
    pub locking_script: Vec<u8>,
}

impl TransactionOutput {
    pub fn new(value: u64, locking_script: Vec<u8>) -> Self {
        Self {
            value,
            locking_script,
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A decoded transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction version
    pub version: u32,
    /// Transaction inputs
    pub inputs: Vec<TransactionInput>,
    /// Transaction outputs
    pub outputs: Vec<TransactionOutput>,
    /// Locktime
    pub locktime: u32,
    /// Whether the transaction is serialized with marker, flag and witnesses
    pub segwit: bool,
    /// Serialized length in bytes
    pub size: usize,
    /// Transaction ID (display order)
    pub txid: [u8; 32],
    /// Network this transaction belongs to
    pub network: Network,
}

impl Transaction {
    /// Create a transaction from its parts
    ///
    /// The segwit layout is used when any input carries witness data.
    pub fn new(
        version: u32,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
        locktime: u32,
        network: Network,
    ) -> Self {
        let segwit = inputs.iter().any(|input| !input.witnesses.is_empty());
        let mut tx = Self {
            version,
            inputs,
            outputs,
            locktime,
            segwit,
            size: 0,
            txid: [0u8; 32],
            network,
        };
        tx.size = tx.serialized_size();
        tx.txid = tx.calculate_txid();
        tx
    }

    /// Decode one transaction from the front of `raw`
    ///
    /// Returns the transaction and the number of bytes it occupied. With
    /// `check_size` set, `raw` must hold exactly one transaction.
    pub fn deserialize(
        raw: &[u8],
        network: Network,
        check_size: bool,
    ) -> Result<(Self, usize), TransactionError> {
        let mut buf = raw;

        let version = take_u32(&mut buf, "version")?;

        let segwit = buf.len() >= 2 && buf[0] == SEGWIT_MARKER;
        if segwit {
            if buf[1] != SEGWIT_FLAG {
                return Err(TransactionError::InvalidSegwitFlag(buf[1]));
            }
            buf.advance(2);
        }

        let input_count = read_varint(&mut buf)?;
        let mut inputs = Vec::with_capacity(bounded_capacity(input_count, buf.len()));
        for _ in 0..input_count {
            let mut prev_txid = take_array::<32>(&mut buf, "previous txid")?;
            prev_txid.reverse();
            let output_index = take_u32(&mut buf, "output index")?;
            let unlocking_script = take_var_bytes(&mut buf, "unlocking script")?;
            let sequence = take_u32(&mut buf, "sequence")?;
            inputs.push(TransactionInput {
                prev_txid,
                output_index,
                unlocking_script,
                sequence,
                witnesses: Vec::new(),
            });
        }

        let output_count = read_varint(&mut buf)?;
        let mut outputs = Vec::with_capacity(bounded_capacity(output_count, buf.len()));
        for _ in 0..output_count {
            ensure(&buf, 8, "output value")?;
            let value = buf.get_u64_le();
            let locking_script = take_var_bytes(&mut buf, "locking script")?;
            outputs.push(TransactionOutput {
                value,
                locking_script,
            });
        }

        if segwit {
            for input in inputs.iter_mut() {
                let items = read_varint(&mut buf)?;
                let mut witnesses = Vec::with_capacity(bounded_capacity(items, buf.len()));
                for _ in 0..items {
                    witnesses.push(take_var_bytes(&mut buf, "witness item")?);
                }
                input.witnesses = witnesses;
            }
        }

        let locktime = take_u32(&mut buf, "locktime")?;

        let consumed = raw.len() - buf.len();
        if check_size && consumed != raw.len() {
            return Err(TransactionError::SizeMismatch {
                consumed,
                available: raw.len(),
            });
        }

        let mut tx = Self {
            version,
            inputs,
            outputs,
            locktime,
            segwit,
            size: consumed,
            txid: [0u8; 32],
            network,
        };
        tx.txid = tx.calculate_txid();

        Ok((tx, consumed))
    }

    /// Serialize in full wire format (with witness data if segwit)
    pub fn raw(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size);
        self.encode_into(&mut out, self.segwit);
        out
    }

    /// Serialize without witness data (the form hashed into the txid)
    pub fn raw_legacy(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out, false);
        out
    }

    /// Transaction ID as hex (display order)
    pub fn txid_hex(&self) -> String {
        hex::encode(self.txid)
    }

    /// Whether this is a coinbase (block reward) transaction
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_null_outpoint()
    }

    /// Sum of all output values, `None` if it overflows a u64
    pub fn total_output(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |total, o| total.checked_add(o.value))
    }

    /// Summary for JSON output
    pub fn summary(&self) -> TransactionSummary {
        TransactionSummary {
            txid: self.txid_hex(),
            version: self.version,
            size: self.size,
            segwit: self.segwit,
            coinbase: self.is_coinbase(),
            inputs: self.inputs.len(),
            outputs: self.outputs.len(),
            total_output: self.total_output(),
            locktime: self.locktime,
        }
    }

    fn calculate_txid(&self) -> [u8; 32] {
        double_sha256_display(&self.raw_legacy())
    }

    fn serialized_size(&self) -> usize {
        let mut size = 4 + varint_size(self.inputs.len() as u64);
        for input in &self.inputs {
            size += 32 + 4 + var_bytes_size(&input.unlocking_script) + 4;
        }
        size += varint_size(self.outputs.len() as u64);
        for output in &self.outputs {
            size += 8 + var_bytes_size(&output.locking_script);
        }
        if self.segwit {
            size += 2;
            for input in &self.inputs {
                size += varint_size(input.witnesses.len() as u64);
                size += input.witnesses.iter().map(|w| var_bytes_size(w)).sum::<usize>();
            }
        }
        size + 4
    }

    fn encode_into<B: BufMut>(&self, out: &mut B, with_witness: bool) {
        out.put_u32_le(self.version);
        if with_witness {
            out.put_u8(SEGWIT_MARKER);
            out.put_u8(SEGWIT_FLAG);
        }

        write_varint(out, self.inputs.len() as u64);
        for input in &self.inputs {
            let mut prev = input.prev_txid;
            prev.reverse();
            out.put_slice(&prev);
            out.put_u32_le(input.output_index);
            put_var_bytes(out, &input.unlocking_script);
            out.put_u32_le(input.sequence);
        }

        write_varint(out, self.outputs.len() as u64);
        for output in &self.outputs {
            out.put_u64_le(output.value);
            put_var_bytes(out, &output.locking_script);
        }

        if with_witness {
            for input in &self.inputs {
                write_varint(out, input.witnesses.len() as u64);
                for item in &input.witnesses {
                    put_var_bytes(out, item);
                }
            }
        }

        out.put_u32_le(self.locktime);
    }
}

/// JSON-friendly view of a transaction
#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    pub txid: String,
    pub version: u32,
    pub size: usize,
    pub segwit: bool,
    pub coinbase: bool,
    pub inputs: usize,
    pub outputs: usize,
    pub total_output: Option<u64>,
    pub locktime: u32,
}

// =============================================================================
// Transaction References
// =============================================================================

/// An entry in a block's transaction list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxRef {
    /// Fully decoded transaction
    Full(Box<Transaction>),
    /// Transaction known only by its ID (display order)
    Known([u8; 32]),
}

impl TxRef {
    /// Transaction ID (display order)
    pub fn txid(&self) -> [u8; 32] {
        match self {
            TxRef::Full(tx) => tx.txid,
            TxRef::Known(txid) => *txid,
        }
    }

    /// The decoded transaction, if available
    pub fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            TxRef::Full(tx) => Some(tx),
            TxRef::Known(_) => None,
        }
    }
}

impl From<Transaction> for TxRef {
    fn from(tx: Transaction) -> Self {
        TxRef::Full(Box::new(tx))
    }
}

// =============================================================================
// Wire helpers
// =============================================================================

fn ensure(buf: &[u8], needed: usize, field: &'static str) -> Result<(), TransactionError> {
    if buf.len() < needed {
        return Err(TransactionError::UnexpectedEnd {
            field,
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

fn take_u32(buf: &mut &[u8], field: &'static str) -> Result<u32, TransactionError> {
    ensure(buf, 4, field)?;
    Ok(buf.get_u32_le())
}

fn take_array<const N: usize>(
    buf: &mut &[u8],
    field: &'static str,
) -> Result<[u8; N], TransactionError> {
    ensure(buf, N, field)?;
    let mut out = [0u8; N];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

fn take_var_bytes(buf: &mut &[u8], field: &'static str) -> Result<Vec<u8>, TransactionError> {
    let len = read_varint(buf)?;
    let available = buf.len();
    let len = usize::try_from(len).map_err(|_| TransactionError::UnexpectedEnd {
        field,
        needed: usize::MAX,
        available,
    })?;
    ensure(buf, len, field)?;
    let data = buf[..len].to_vec();
    buf.advance(len);
    Ok(data)
}

fn put_var_bytes<B: BufMut>(out: &mut B, data: &[u8]) {
    write_varint(out, data.len() as u64);
    out.put_slice(data);
}

fn var_bytes_size(data: &[u8]) -> usize {
    varint_size(data.len() as u64) + data.len()
}

// Declared counts are untrusted; cap preallocation at the remaining bytes.
fn bounded_capacity(declared: u64, remaining: usize) -> usize {
    (declared as usize).min(remaining)
}

// =============================================================================
// Tests
// =============================================================================
