//! Wire format serialization/deserialization
//!
//! Canonical byte layouts for transactions, outpoints, and UTXO records:
//! little-endian fixed-width integers, varint length prefixes, ordered
//! concatenation for sequences. Deserialization is strict - every length
//! prefix is checked against the remaining bytes and trailing garbage is an
//! error; malformed input is surfaced, never repaired.

use crate::constants::{SEGWIT_FLAG, SEGWIT_MARKER};
use crate::error::{CoreError, Result};
use crate::types::*;

/// Encode a u64 as a compact-size varint.
///
/// Values below 0xfd are a single byte; larger values carry a 0xfd/0xfe/0xff
/// prefix followed by 2, 4, or 8 little-endian bytes.
pub fn encode_varint(value: u64) -> Vec<u8> {
    if value < 0xfd {
        vec![value as u8]
    } else if value <= 0xffff {
        let mut result = vec![0xfd];
        result.extend_from_slice(&(value as u16).to_le_bytes());
        result
    } else if value <= 0xffff_ffff {
        let mut result = vec![0xfe];
        result.extend_from_slice(&(value as u32).to_le_bytes());
        result
    } else {
        let mut result = vec![0xff];
        result.extend_from_slice(&value.to_le_bytes());
        result
    }
}

/// Decode a varint, returning the value and the number of bytes consumed.
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let first = *data
        .first()
        .ok_or_else(|| CoreError::Decode("insufficient bytes for varint".to_string()))?;
    match first {
        0..=0xfc => Ok((first as u64, 1)),
        0xfd => {
            let bytes = take(data, 1, 2)?;
            Ok((u16::from_le_bytes([bytes[0], bytes[1]]) as u64, 3))
        }
        0xfe => {
            let bytes = take(data, 1, 4)?;
            Ok((
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64,
                5,
            ))
        }
        0xff => {
            let bytes = take(data, 1, 8)?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            Ok((u64::from_le_bytes(raw), 9))
        }
    }
}

fn take(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    data.get(offset..offset + len)
        .ok_or_else(|| CoreError::Decode("insufficient bytes".to_string()))
}

fn write_outpoint(buf: &mut Vec<u8>, prevout: &Outpoint) {
    buf.extend_from_slice(&prevout.txid);
    buf.extend_from_slice(&prevout.vout.to_le_bytes());
}

fn write_var_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&encode_varint(bytes.len() as u64));
    buf.extend_from_slice(bytes);
}

fn write_inputs_outputs(buf: &mut Vec<u8>, tx: &Transaction) {
    buf.extend_from_slice(&encode_varint(tx.inputs.len() as u64));
    for input in &tx.inputs {
        write_outpoint(buf, &input.prevout);
        write_var_bytes(buf, &input.script_sig);
        buf.extend_from_slice(&input.sequence.to_le_bytes());
    }

    buf.extend_from_slice(&encode_varint(tx.outputs.len() as u64));
    for output in &tx.outputs {
        buf.extend_from_slice(&output.value.to_le_bytes());
        write_var_bytes(buf, &output.script_pubkey);
    }
}

/// Serialize the witness-stripped form: version, inputs, outputs, lock time.
///
/// This is the byte sequence behind both the transaction id and the
/// signature pre-image.
pub fn serialize_transaction_base(tx: &Transaction) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&tx.version.to_le_bytes());
    write_inputs_outputs(&mut buf, tx);
    buf.extend_from_slice(&tx.lock_time.to_le_bytes());
    buf
}

/// Serialize the full transaction.
///
/// With witness data present the marker/flag pair follows the version and
/// the witness stacks precede the lock time; witnesses must then align 1:1
/// with inputs.
pub fn serialize_transaction(tx: &Transaction) -> Result<Vec<u8>> {
    if !tx.has_witness() {
        return Ok(serialize_transaction_base(tx));
    }
    if tx.witnesses.len() != tx.inputs.len() {
        return Err(CoreError::Transaction(format!(
            "{} witness stacks for {} inputs",
            tx.witnesses.len(),
            tx.inputs.len()
        )));
    }

    let mut buf = Vec::new();
    buf.extend_from_slice(&tx.version.to_le_bytes());
    buf.push(SEGWIT_MARKER);
    buf.push(SEGWIT_FLAG);
    write_inputs_outputs(&mut buf, tx);
    for witness in &tx.witnesses {
        buf.extend_from_slice(&encode_varint(witness.len() as u64));
        for item in witness {
            write_var_bytes(&mut buf, item);
        }
    }
    buf.extend_from_slice(&tx.lock_time.to_le_bytes());
    Ok(buf)
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let slice = take(self.data, self.offset, len)?;
        self.offset += len;
        Ok(slice)
    }

    fn u32_le(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64_le(&mut self) -> Result<u64> {
        let b = self.bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }

    fn varint(&mut self) -> Result<u64> {
        let (value, consumed) = decode_varint(&self.data[self.offset.min(self.data.len())..])?;
        self.offset += consumed;
        Ok(value)
    }

    fn var_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.varint()?;
        if len > crate::constants::MAX_TX_SIZE as u64 {
            return Err(CoreError::Decode(format!("length prefix {len} too large")));
        }
        Ok(self.bytes(len as usize)?.to_vec())
    }

    fn outpoint(&mut self) -> Result<Outpoint> {
        let mut txid = [0u8; 32];
        txid.copy_from_slice(self.bytes(32)?);
        let vout = self.u32_le()?;
        Ok(Outpoint { txid, vout })
    }

    fn done(&self) -> bool {
        self.offset == self.data.len()
    }
}

fn read_inputs(reader: &mut Reader) -> Result<Vec<TxInput>> {
    let count = reader.varint()?;
    if count > crate::constants::MAX_TX_SIZE as u64 {
        return Err(CoreError::Decode(format!("input count {count} too large")));
    }
    let mut inputs = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let prevout = reader.outpoint()?;
        let script_sig = reader.var_bytes()?;
        let sequence = reader.u32_le()?;
        inputs.push(TxInput {
            prevout,
            script_sig,
            sequence,
        });
    }
    Ok(inputs)
}

fn read_outputs(reader: &mut Reader) -> Result<Vec<TxOutput>> {
    let count = reader.varint()?;
    if count > crate::constants::MAX_TX_SIZE as u64 {
        return Err(CoreError::Decode(format!("output count {count} too large")));
    }
    let mut outputs = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let value = reader.u64_le()?;
        let script_pubkey = reader.var_bytes()?;
        outputs.push(TxOutput {
            value,
            script_pubkey,
        });
    }
    Ok(outputs)
}

/// Deserialize a transaction, accepting both legacy and witness forms.
pub fn deserialize_transaction(data: &[u8]) -> Result<Transaction> {
    let mut reader = Reader::new(data);
    let version = reader.u32_le()?;

    // A zero marker byte cannot start a legacy input count of a valid
    // transaction, so it unambiguously announces witness data.
    let segwit = matches!(take(data, reader.offset, 2), Ok([SEGWIT_MARKER, SEGWIT_FLAG]));
    if segwit {
        reader.bytes(2)?;
    }

    let inputs = read_inputs(&mut reader)?;
    let outputs = read_outputs(&mut reader)?;

    let mut witnesses = Vec::new();
    if segwit {
        for _ in 0..inputs.len() {
            let item_count = reader.varint()?;
            if item_count > crate::constants::MAX_TX_SIZE as u64 {
                return Err(CoreError::Decode(format!(
                    "witness item count {item_count} too large"
                )));
            }
            let mut items = Vec::with_capacity(item_count.min(1024) as usize);
            for _ in 0..item_count {
                items.push(reader.var_bytes()?);
            }
            witnesses.push(items);
        }
    }

    let lock_time = reader.u32_le()?;

    if !reader.done() {
        return Err(CoreError::Decode(format!(
            "{} trailing bytes after transaction",
            data.len() - reader.offset
        )));
    }

    Ok(Transaction {
        version,
        inputs,
        outputs,
        witnesses,
        lock_time,
    })
}

/// Serialize a UTXO record: outpoint, height, value, locking script,
/// coinbase flag.
pub fn serialize_utxo(utxo: &Utxo) -> Vec<u8> {
    let mut buf = Vec::new();
    write_outpoint(&mut buf, &utxo.outpoint);
    buf.extend_from_slice(&utxo.height.to_le_bytes());
    buf.extend_from_slice(&utxo.value.to_le_bytes());
    write_var_bytes(&mut buf, &utxo.script_pubkey);
    buf.push(utxo.coinbase as u8);
    buf
}

/// Deserialize a UTXO record.
pub fn deserialize_utxo(data: &[u8]) -> Result<Utxo> {
    let mut reader = Reader::new(data);
    let outpoint = reader.outpoint()?;
    let height = reader.u64_le()?;
    let value = reader.u64_le()?;
    let script_pubkey = reader.var_bytes()?;
    let coinbase = match reader.bytes(1)?[0] {
        0 => false,
        1 => true,
        b => {
            return Err(CoreError::Decode(format!(
                "invalid coinbase flag 0x{b:02x}"
            )))
        }
    };

    if !reader.done() {
        return Err(CoreError::Decode("trailing bytes after UTXO".to_string()));
    }

    Ok(Utxo {
        outpoint,
        height,
        value,
        script_pubkey,
        coinbase,
    })
}
