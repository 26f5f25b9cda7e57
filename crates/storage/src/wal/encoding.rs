//! WAL record encoding and decoding
//!
//! ## Record Format
//!
//! ```text
//! [length: u32][type: u8][payload: bytes][crc32: u32]
//! ```
//!
//! - **length**: size of type + payload + crc (not including length itself)
//! - **type**: record type tag (1 = Put, 2 = Delete)
//! - **payload**: MessagePack-serialized [`WalRecord`]
//! - **crc32**: CRC32 over \[type\]\[payload\]
//!
//! MessagePack is used rather than bincode because document bodies are
//! `serde_json::Value`, which needs a self-describing format to decode.

use super::WalRecord;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;
use linkdb_core::{Error, Result};
use std::io::Cursor;

const TYPE_PUT: u8 = 1;
const TYPE_DELETE: u8 = 2;

/// Bytes of framing around a payload: length + type + crc.
const FRAME_OVERHEAD: usize = 4 + 1 + 4;

/// Encode a record to a framed byte buffer ready for appending.
pub fn encode_record(record: &WalRecord) -> Result<Vec<u8>> {
    let type_tag = match record {
        WalRecord::Put { .. } => TYPE_PUT,
        WalRecord::Delete { .. } => TYPE_DELETE,
    };

    let payload =
        rmp_serde::to_vec(record).map_err(|e| Error::Serialization(e.to_string()))?;

    let total_len = 1 + payload.len() + 4;
    let mut buf = Vec::with_capacity(4 + total_len);

    buf.write_u32::<LittleEndian>(total_len as u32)?;
    buf.push(type_tag);
    buf.extend_from_slice(&payload);

    let mut hasher = Hasher::new();
    hasher.update(&[type_tag]);
    hasher.update(&payload);
    buf.write_u32::<LittleEndian>(hasher.finalize())?;

    Ok(buf)
}

/// Outcome of decoding at some offset.
#[derive(Debug)]
pub enum Decoded {
    /// A complete, valid record and the number of bytes it used
    Record(WalRecord, usize),
    /// Not enough bytes for a full record (torn write at the tail)
    Incomplete,
}

/// Decode one record from the start of `buf`.
///
/// `offset` is only used for error messages.
pub fn decode_record(buf: &[u8], offset: u64) -> Result<Decoded> {
    if buf.len() < FRAME_OVERHEAD {
        return Ok(Decoded::Incomplete);
    }

    let mut cursor = Cursor::new(buf);
    let total_len = cursor.read_u32::<LittleEndian>()? as usize;
    if total_len < 5 {
        return Err(Error::Corruption(format!(
            "record at offset {} has impossible length {}",
            offset, total_len
        )));
    }
    if buf.len() < 4 + total_len {
        return Ok(Decoded::Incomplete);
    }

    let type_tag = buf[4];
    let payload = &buf[5..4 + total_len - 4];
    let mut crc_bytes = &buf[4 + total_len - 4..4 + total_len];
    let stored_crc = crc_bytes.read_u32::<LittleEndian>()?;

    let mut hasher = Hasher::new();
    hasher.update(&[type_tag]);
    hasher.update(payload);
    if hasher.finalize() != stored_crc {
        return Err(Error::Corruption(format!(
            "CRC mismatch for record at offset {}",
            offset
        )));
    }

    let record: WalRecord = rmp_serde::from_slice(payload).map_err(|e| {
        Error::Corruption(format!("undecodable record at offset {}: {}", offset, e))
    })?;

    let expected_tag = match record {
        WalRecord::Put { .. } => TYPE_PUT,
        WalRecord::Delete { .. } => TYPE_DELETE,
    };
    if expected_tag != type_tag {
        return Err(Error::Corruption(format!(
            "type tag {} does not match payload at offset {}",
            type_tag, offset
        )));
    }

    Ok(Decoded::Record(record, 4 + total_len))
}
