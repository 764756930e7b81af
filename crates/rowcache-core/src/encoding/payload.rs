//! Structured binary format for [`Payload`] values.
//!
//! # Format
//!
//! After the 2-byte header (`0x01`, [`FORMAT_VERSION`]) a single value follows.
//! Each value is a 1-byte type tag and its payload:
//!
//! - `Null`: `0x00`
//! - `Bool`: `0x01` + `0x00` (false) or `0x01` (true)
//! - `Int`: `0x02` + 8 bytes (big-endian i64)
//! - `Float`: `0x03` + 8 bytes (big-endian IEEE 754 f64)
//! - `String`: `0x04` + 4 bytes length + UTF-8 bytes
//! - `List`: `0x05` + 4 bytes count + encoded values
//! - `Map`: `0x06` + 4 bytes count + (4 bytes key length + key bytes + encoded value) pairs
//!
//! Map entries are written in key order, so equal maps encode identically.

use std::collections::BTreeMap;

use super::traits::{CacheValue, Decoded, Encoder, FORMAT_VERSION, MARKER_STRUCTURED};
use crate::error::CoreError;
use crate::types::Payload;

/// Type tags for payload variants.
mod tags {
    pub const NULL: u8 = 0x00;
    pub const BOOL: u8 = 0x01;
    pub const INT: u8 = 0x02;
    pub const FLOAT: u8 = 0x03;
    pub const STRING: u8 = 0x04;
    pub const LIST: u8 = 0x05;
    pub const MAP: u8 = 0x06;
}

/// Nesting limit when decoding, so corrupt input cannot exhaust the stack.
const MAX_DEPTH: usize = 128;

impl Encoder for Payload {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), CoreError> {
        buf.push(MARKER_STRUCTURED);
        buf.push(FORMAT_VERSION);
        write_value(self, buf)
    }
}

impl CacheValue for Payload {
    fn encode_value(&self) -> Result<Vec<u8>, CoreError> {
        self.encode()
    }

    fn decode_value(bytes: &[u8]) -> Decoded<Self> {
        decode_payload(bytes)
    }
}

/// Decode a structured payload, header included.
///
/// Returns [`Decoded::Undecodable`] for anything that is not a complete,
/// well-formed structured payload of the current version.
#[must_use]
pub fn decode_payload(bytes: &[u8]) -> Decoded<Payload> {
    let body = match bytes {
        [MARKER_STRUCTURED, FORMAT_VERSION, body @ ..] => body,
        _ => return Decoded::Undecodable,
    };

    let mut reader = Reader { bytes: body, pos: 0 };
    match reader.read_value(0) {
        Ok(value) if reader.pos == body.len() => Decoded::Value(value),
        _ => Decoded::Undecodable,
    }
}

fn write_len(len: usize, what: &str, buf: &mut Vec<u8>) -> Result<(), CoreError> {
    let len = u32::try_from(len).map_err(|_| CoreError::encoding(format!("{what} too long")))?;
    buf.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn write_value(value: &Payload, buf: &mut Vec<u8>) -> Result<(), CoreError> {
    match value {
        Payload::Null => buf.push(tags::NULL),
        Payload::Bool(b) => {
            buf.push(tags::BOOL);
            buf.push(u8::from(*b));
        }
        Payload::Int(i) => {
            buf.push(tags::INT);
            buf.extend_from_slice(&i.to_be_bytes());
        }
        Payload::Float(f) => {
            buf.push(tags::FLOAT);
            buf.extend_from_slice(&f.to_be_bytes());
        }
        Payload::String(s) => {
            buf.push(tags::STRING);
            write_len(s.len(), "string", buf)?;
            buf.extend_from_slice(s.as_bytes());
        }
        Payload::List(items) => {
            buf.push(tags::LIST);
            write_len(items.len(), "list", buf)?;
            for item in items {
                write_value(item, buf)?;
            }
        }
        Payload::Map(map) => {
            buf.push(tags::MAP);
            write_len(map.len(), "map", buf)?;
            for (key, item) in map {
                write_len(key.len(), "map key", buf)?;
                buf.extend_from_slice(key.as_bytes());
                write_value(item, buf)?;
            }
        }
    }
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CoreError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| CoreError::encoding("unexpected end of input"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CoreError> {
        Ok(self.take(1)?[0])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CoreError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_len(&mut self) -> Result<usize, CoreError> {
        let len = u32::from_be_bytes(self.read_array()?);
        usize::try_from(len).map_err(|_| CoreError::encoding("length overflows usize"))
    }

    fn read_string(&mut self) -> Result<String, CoreError> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| CoreError::encoding(e.to_string()))
    }

    fn read_value(&mut self, depth: usize) -> Result<Payload, CoreError> {
        if depth > MAX_DEPTH {
            return Err(CoreError::encoding("nesting too deep"));
        }

        match self.read_u8()? {
            tags::NULL => Ok(Payload::Null),
            tags::BOOL => match self.read_u8()? {
                0 => Ok(Payload::Bool(false)),
                1 => Ok(Payload::Bool(true)),
                other => Err(CoreError::encoding(format!("invalid bool byte {other:#04x}"))),
            },
            tags::INT => Ok(Payload::Int(i64::from_be_bytes(self.read_array()?))),
            tags::FLOAT => Ok(Payload::Float(f64::from_be_bytes(self.read_array()?))),
            tags::STRING => self.read_string().map(Payload::String),
            tags::LIST => {
                let count = self.read_len()?;
                // Every element takes at least one byte; cap the preallocation
                // by what is left so a corrupt count cannot allocate wildly.
                let mut items = Vec::with_capacity(count.min(self.bytes.len() - self.pos));
                for _ in 0..count {
                    items.push(self.read_value(depth + 1)?);
                }
                Ok(Payload::List(items))
            }
            tags::MAP => {
                let count = self.read_len()?;
                let mut map = BTreeMap::new();
                for _ in 0..count {
                    let key = self.read_string()?;
                    let value = self.read_value(depth + 1)?;
                    map.insert(key, value);
                }
                Ok(Payload::Map(map))
            }
            other => Err(CoreError::encoding(format!("unknown type tag {other:#04x}"))),
        }
    }
}
