//! Canonical CBOR encoding for deterministic record serialization.
//!
//! Records are authored as JSON objects, but the bytes that get hashed into a
//! content address and signed by a party are the RFC 8949 Core Deterministic
//! Encoding of the same data model:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats
//!
//! The canonical encoding is critical: a signature only verifies if every
//! implementation produces identical bytes for semantically identical records,
//! independent of the order keys were inserted in.

use ciborium::value::{Integer, Value as Cbor};
use serde_json::{Map, Number, Value};

use crate::crypto::Blake3Hash;
use crate::error::{CoreError, Result};
use crate::types::RecordId;

/// Encode a JSON record to canonical CBOR bytes.
pub fn canonical_bytes(record: &Value) -> Result<Vec<u8>> {
    let value = json_to_cbor(record)?;
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value)?;
    Ok(buf)
}

/// Compute the content address of a record: Blake3(canonical_bytes(record)).
pub fn content_address(record: &Value) -> Result<RecordId> {
    let bytes = canonical_bytes(record)?;
    Ok(RecordId(Blake3Hash::hash(&bytes).0))
}

/// Decode canonical bytes back into a JSON record.
///
/// Rejects trailing bytes and any CBOR that has no JSON counterpart (tags,
/// byte strings, floats, non-text map keys).
pub fn decode_record(bytes: &[u8]) -> Result<Value> {
    let mut cursor = std::io::Cursor::new(bytes);
    let value: Cbor =
        ciborium::from_reader(&mut cursor).map_err(|e| CoreError::EncodingError(e.to_string()))?;
    if cursor.position() as usize != bytes.len() {
        return Err(CoreError::EncodingError("trailing bytes after record".into()));
    }
    cbor_to_json(value)
}

/// Map a JSON value onto the CBOR data model.
fn json_to_cbor(value: &Value) -> Result<Cbor> {
    Ok(match value {
        Value::Null => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::Number(n) => Cbor::Integer(number_to_integer(n)?),
        Value::String(s) => Cbor::Text(s.clone()),
        Value::Array(items) => Cbor::Array(
            items
                .iter()
                .map(json_to_cbor)
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Object(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (k, v) in map {
                entries.push((Cbor::Text(k.clone()), json_to_cbor(v)?));
            }
            Cbor::Map(entries)
        }
    })
}

fn number_to_integer(n: &Number) -> Result<Integer> {
    if let Some(u) = n.as_u64() {
        Ok(Integer::from(u))
    } else if let Some(i) = n.as_i64() {
        Ok(Integer::from(i))
    } else {
        Err(CoreError::FloatRejected(n.to_string()))
    }
}

fn cbor_to_json(value: Cbor) -> Result<Value> {
    match value {
        Cbor::Null => Ok(Value::Null),
        Cbor::Bool(b) => Ok(Value::Bool(b)),
        Cbor::Integer(i) => {
            let n: i128 = i.into();
            if let Ok(u) = u64::try_from(n) {
                Ok(Value::from(u))
            } else if let Ok(s) = i64::try_from(n) {
                Ok(Value::from(s))
            } else {
                Err(CoreError::EncodingError(format!("integer out of range: {n}")))
            }
        }
        Cbor::Text(s) => Ok(Value::String(s)),
        Cbor::Array(items) => Ok(Value::Array(
            items
                .into_iter()
                .map(cbor_to_json)
                .collect::<Result<Vec<_>>>()?,
        )),
        Cbor::Map(entries) => {
            let mut map = Map::new();
            for (k, v) in entries {
                let key = match k {
                    Cbor::Text(s) => s,
                    _ => return Err(CoreError::EncodingError("non-text map key".into())),
                };
                map.insert(key, cbor_to_json(v)?);
            }
            Ok(Value::Object(map))
        }
        Cbor::Float(f) => Err(CoreError::FloatRejected(f.to_string())),
        _ => Err(CoreError::EncodingError("unsupported CBOR value type".into())),
    }
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Cbor) -> Result<()> {
    match value {
        Cbor::Integer(i) => encode_integer(buf, *i),
        Cbor::Bytes(b) => encode_bytes(buf, b),
        Cbor::Text(s) => encode_text(buf, s),
        Cbor::Array(arr) => encode_array(buf, arr)?,
        Cbor::Map(entries) => encode_map_canonical(buf, entries)?,
        Cbor::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Cbor::Null => buf.push(0xf6),
        Cbor::Float(f) => return Err(CoreError::FloatRejected(f.to_string())),
        _ => return Err(CoreError::EncodingError("unsupported CBOR value type".into())),
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4).
fn encode_array(buf: &mut Vec<u8>, arr: &[Cbor]) -> Result<()> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item)?;
    }
    Ok(())
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison, so shorter keys sort
/// before longer ones and equal-length keys sort bytewise.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Cbor, Cbor)]) -> Result<()> {
    let mut key_value_pairs: Vec<(Vec<u8>, &Cbor)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        key_value_pairs.push((key_buf, v));
    }

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);

    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}
