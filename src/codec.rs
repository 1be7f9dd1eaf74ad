//! On-disk event record format.
//!
//! This module owns **every byte that crosses the file boundary** between
//! the event store and anything that reads or writes it (validator CLI,
//! fixture writers, embedders).
//!
//! ## File layout
//!
//! | Section  | Bytes         | Meaning                              |
//! |----------|---------------|--------------------------------------|
//! | magic    | 8             | `b"DOTEVT\x01\0"` (format version 1) |
//! | records  | repeated      | length-prefixed event records        |
//!
//! Record = `u32` LE body length, then body:
//!
//! | Field  | Bytes        | Meaning                    |
//! |--------|--------------|----------------------------|
//! | code   | `u16` LE + n | channel name, UTF-8        |
//! | time   | 8            | `i64` LE, microseconds     |
//! | value  | variable     | tagged value (see below)   |
//!
//! Values are one tag byte followed by a little-endian payload; string,
//! byte, list and map lengths are `u32` LE counts.
//!
//! ## Design rules
//!
//! 1. Every multi-byte quantity is little-endian. No field is
//!    platform-native.
//! 2. Decoding never panics on short input: every length is checked
//!    against the remaining bytes first.
//! 3. A record body longer than [`MAX_RECORD_LEN`] is rejected before any
//!    allocation happens, so a corrupt length prefix fails fast.

use crate::types::Value;
use bytes::{Buf, BufMut};
use thiserror::Error;

/// Leading magic of a version-1 event file.
pub const MAGIC: [u8; 8] = *b"DOTEVT\x01\0";

/// Upper bound on a single record body. Generous for dot payloads
/// (1000 dots is 8 KiB) while keeping corrupt prefixes cheap to reject.
pub const MAX_RECORD_LEN: usize = 16 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Value tags
// ---------------------------------------------------------------------------

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INTEGER: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_STR: u8 = 4;
const TAG_BYTES: u8 = 5;
const TAG_LIST: u8 = 6;
const TAG_MAP: u8 = 7;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures raised by the event store and its codec.
///
/// All are fatal to the read in progress; none are retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("not an event file (bad magic)")]
    BadMagic,
    #[error("event file ends mid-record")]
    Truncated,
    #[error("unknown value tag {0:#04x}")]
    UnknownTag(u8),
    #[error("record body has {0} trailing bytes after its value")]
    TrailingBytes(usize),
    #[error("record body of {0} bytes exceeds the {MAX_RECORD_LEN}-byte cap")]
    OversizedRecord(usize),
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Append one encoded value to `buf`.
pub fn encode_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.put_u8(TAG_NULL),
        Value::Bool(b) => {
            buf.put_u8(TAG_BOOL);
            buf.put_u8(u8::from(*b));
        }
        Value::Integer(i) => {
            buf.put_u8(TAG_INTEGER);
            buf.put_i64_le(*i);
        }
        Value::Float(f) => {
            buf.put_u8(TAG_FLOAT);
            buf.put_f64_le(*f);
        }
        Value::Str(s) => {
            buf.put_u8(TAG_STR);
            buf.put_u32_le(s.len() as u32);
            buf.put_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            buf.put_u8(TAG_BYTES);
            buf.put_u32_le(b.len() as u32);
            buf.put_slice(b);
        }
        Value::List(items) => {
            buf.put_u8(TAG_LIST);
            buf.put_u32_le(items.len() as u32);
            for item in items {
                encode_value(buf, item);
            }
        }
        Value::Map(entries) => {
            buf.put_u8(TAG_MAP);
            buf.put_u32_le(entries.len() as u32);
            for (key, val) in entries {
                buf.put_u32_le(key.len() as u32);
                buf.put_slice(key.as_bytes());
                encode_value(buf, val);
            }
        }
    }
}

/// Encode one record body (code + time + value), without the length prefix.
pub fn encode_record(code: &str, time: i64, value: &Value) -> Vec<u8> {
    let mut body = Vec::with_capacity(16 + code.len());
    body.put_u16_le(code.len() as u16);
    body.put_slice(code.as_bytes());
    body.put_i64_le(time);
    encode_value(&mut body, value);
    body
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn take<'a>(buf: &mut &'a [u8], n: usize) -> Result<&'a [u8], StoreError> {
    if buf.remaining() < n {
        return Err(StoreError::Truncated);
    }
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

fn take_string(buf: &mut &[u8], n: usize) -> Result<String, StoreError> {
    let raw = take(buf, n)?;
    String::from_utf8(raw.to_vec()).map_err(|_| StoreError::InvalidUtf8)
}

/// Decode one value from the front of `buf`, advancing it.
pub fn decode_value(buf: &mut &[u8]) -> Result<Value, StoreError> {
    if !buf.has_remaining() {
        return Err(StoreError::Truncated);
    }
    let tag = buf.get_u8();
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_BOOL => {
            if !buf.has_remaining() {
                return Err(StoreError::Truncated);
            }
            Ok(Value::Bool(buf.get_u8() != 0))
        }
        TAG_INTEGER => {
            if buf.remaining() < 8 {
                return Err(StoreError::Truncated);
            }
            Ok(Value::Integer(buf.get_i64_le()))
        }
        TAG_FLOAT => {
            if buf.remaining() < 8 {
                return Err(StoreError::Truncated);
            }
            Ok(Value::Float(buf.get_f64_le()))
        }
        TAG_STR => {
            let len = decode_len(buf)?;
            Ok(Value::Str(take_string(buf, len)?))
        }
        TAG_BYTES => {
            let len = decode_len(buf)?;
            Ok(Value::Bytes(take(buf, len)?.to_vec()))
        }
        TAG_LIST => {
            let count = decode_len(buf)?;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(decode_value(buf)?);
            }
            Ok(Value::List(items))
        }
        TAG_MAP => {
            let count = decode_len(buf)?;
            let mut entries = std::collections::HashMap::with_capacity(count.min(1024));
            for _ in 0..count {
                let key_len = decode_len(buf)?;
                let key = take_string(buf, key_len)?;
                let val = decode_value(buf)?;
                entries.insert(key, val);
            }
            Ok(Value::Map(entries))
        }
        other => Err(StoreError::UnknownTag(other)),
    }
}

fn decode_len(buf: &mut &[u8]) -> Result<usize, StoreError> {
    if buf.remaining() < 4 {
        return Err(StoreError::Truncated);
    }
    Ok(buf.get_u32_le() as usize)
}

/// Decode one record body into `(code, time, value)`.
///
/// The body must be exactly one record; trailing bytes mean the length
/// prefix and the content disagree, which is corruption.
pub fn decode_record(mut body: &[u8]) -> Result<(String, i64, Value), StoreError> {
    if body.remaining() < 2 {
        return Err(StoreError::Truncated);
    }
    let code_len = body.get_u16_le() as usize;
    let code = take_string(&mut body, code_len)?;
    if body.remaining() < 8 {
        return Err(StoreError::Truncated);
    }
    let time = body.get_i64_le();
    let value = decode_value(&mut body)?;
    if body.has_remaining() {
        return Err(StoreError::TrailingBytes(body.remaining()));
    }
    Ok((code, time, value))
}
