//! Data section encoding and decoding
//!
//! Self-describing typed values. Each value starts with a control byte whose
//! top three bits select the kind and whose low five bits hold the payload
//! size. Kind 0 means "extended": the real kind is `7 + next byte`.
//!
//! # Supported Types
//!
//! - **Pointer** (1): offset of another value in the same section
//! - **String** (2): UTF-8 text
//! - **Double** (3): IEEE 754, 8 bytes
//! - **Bytes** (4): raw byte arrays
//! - **Uint16** (5), **Uint32** (6): big-endian, leading zero bytes dropped
//! - **Map** (7): string keys, any values
//! - **Int32** (8), **Uint64** (9), **Uint128** (10)
//! - **Array** (11)
//! - **Bool** (14): value stored in the size field
//! - **Float** (15): IEEE 754, 4 bytes
//!
//! Sizes below 29 live in the control byte. 29, 30 and 31 mean one, two or
//! three following size bytes, offset by 29, 285 and 65821 respectively.
//!
//! Decoding is driven by a [`ReadCursor`]. Pointers are followed through
//! [`ReadCursor::resolve_pointer`], so a value reached by pointer leaves the
//! caller's position untouched.

use crate::cursor::ReadCursor;
use crate::error::{MmdbError, Result};
use crate::pointer::{self, POINTER_KIND};
use std::collections::HashMap;

const KIND_EXTENDED: u8 = 0;
const KIND_STRING: u8 = 2;
const KIND_DOUBLE: u8 = 3;
const KIND_BYTES: u8 = 4;
const KIND_UINT16: u8 = 5;
const KIND_UINT32: u8 = 6;
const KIND_MAP: u8 = 7;
const KIND_INT32: u8 = 8;
const KIND_UINT64: u8 = 9;
const KIND_UINT128: u8 = 10;
const KIND_ARRAY: u8 = 11;
const KIND_BOOL: u8 = 14;
const KIND_FLOAT: u8 = 15;

/// Nesting limit for maps, arrays and pointer hops
const MAX_DEPTH: usize = 512;

/// Largest payload size the three-byte size form can express
pub const MAX_SIZE: usize = 65_821 + 0xFF_FFFF;

/// A typed value stored in the data section
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Pointer to another data item (offset)
    Pointer(u32),
    /// UTF-8 string
    String(String),
    /// IEEE 754 double precision float
    Double(f64),
    /// Raw byte array
    Bytes(Vec<u8>),
    /// Unsigned 16-bit integer
    Uint16(u16),
    /// Unsigned 32-bit integer
    Uint32(u32),
    /// Key-value map (string keys only)
    Map(HashMap<String, DataValue>),
    /// Signed 32-bit integer
    Int32(i32),
    /// Unsigned 64-bit integer
    Uint64(u64),
    /// Unsigned 128-bit integer
    Uint128(u128),
    /// Array of values
    Array(Vec<DataValue>),
    /// Boolean value
    Bool(bool),
    /// IEEE 754 single precision float
    Float(f32),
}

impl DataValue {
    /// Unsigned value of any unsigned integer kind
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            DataValue::Uint16(n) => Some(*n as u64),
            DataValue::Uint32(n) => Some(*n as u64),
            DataValue::Uint64(n) => Some(*n),
            DataValue::Uint128(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Borrow the string payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the map payload
    pub fn as_map(&self) -> Option<&HashMap<String, DataValue>> {
        match self {
            DataValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

/// Data section encoder
///
/// Builds a data section by appending values and tracking their offsets.
/// Identical top-level values share one offset. Inside maps and arrays, a
/// sub-value that was already written is replaced by a pointer to it
/// whenever the pointer is the shorter encoding.
pub struct DataEncoder {
    /// Encoded data buffer
    buffer: Vec<u8>,
    /// Map from inline encoding to the offset holding that value
    dedup_map: HashMap<Vec<u8>, u32>,
}

impl DataEncoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            dedup_map: HashMap::new(),
        }
    }

    /// Encode a value and return its offset
    ///
    /// If the value was previously encoded, returns the existing offset.
    /// Fails with `Build` when a payload is too large for the size field or
    /// the section grows past 32-bit offsets.
    pub fn encode(&mut self, value: &DataValue) -> Result<u32> {
        let inline = Self::inline_bytes(value)?;
        if let Some(&offset) = self.dedup_map.get(&inline) {
            return Ok(offset);
        }

        let offset = self.next_offset()?;
        self.write_value(value)?;
        if !matches!(value, DataValue::Pointer(_)) {
            self.dedup_map.insert(inline, offset);
        }
        Ok(offset)
    }

    /// Get the final encoded data section
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get current buffer size
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Standalone encoding of `value` with every child written inline
    pub fn inline_bytes(value: &DataValue) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        Self::encode_to_buffer(value, &mut buffer)?;
        Ok(buffer)
    }

    /// Offset the next write lands at
    fn next_offset(&self) -> Result<u32> {
        u32::try_from(self.buffer.len()).map_err(|_| {
            MmdbError::Build(format!(
                "Data section of {} bytes exceeds 32-bit offsets",
                self.buffer.len()
            ))
        })
    }

    fn write_value(&mut self, value: &DataValue) -> Result<()> {
        match value {
            DataValue::Map(m) => {
                Self::encode_header(KIND_MAP, m.len(), &mut self.buffer)?;
                for (key, child) in sorted_pairs(m) {
                    self.write_shared(&DataValue::String(key.clone()))?;
                    self.write_shared(child)?;
                }
                Ok(())
            }
            DataValue::Array(items) => {
                Self::encode_header(KIND_ARRAY, items.len(), &mut self.buffer)?;
                for child in items {
                    self.write_shared(child)?;
                }
                Ok(())
            }
            other => Self::encode_to_buffer(other, &mut self.buffer),
        }
    }

    /// Write a nested value, pointing at an earlier copy when that is shorter
    fn write_shared(&mut self, value: &DataValue) -> Result<()> {
        if matches!(value, DataValue::Pointer(_)) {
            return Self::encode_to_buffer(value, &mut self.buffer);
        }

        let inline = Self::inline_bytes(value)?;
        if let Some(&offset) = self.dedup_map.get(&inline) {
            if pointer::encoded_len(offset) < inline.len() {
                pointer::encode_into(offset, &mut self.buffer);
                return Ok(());
            }
        }

        let offset = self.next_offset()?;
        self.write_value(value)?;
        self.dedup_map.entry(inline).or_insert(offset);
        Ok(())
    }

    fn encode_to_buffer(value: &DataValue, buffer: &mut Vec<u8>) -> Result<()> {
        match value {
            DataValue::Pointer(offset) => pointer::encode_into(*offset, buffer),
            DataValue::String(s) => {
                Self::encode_header(KIND_STRING, s.len(), buffer)?;
                buffer.extend_from_slice(s.as_bytes());
            }
            DataValue::Double(d) => {
                Self::encode_header(KIND_DOUBLE, 8, buffer)?;
                buffer.extend_from_slice(&d.to_be_bytes());
            }
            DataValue::Bytes(b) => {
                Self::encode_header(KIND_BYTES, b.len(), buffer)?;
                buffer.extend_from_slice(b);
            }
            DataValue::Uint16(n) => Self::encode_uint(KIND_UINT16, *n as u128, buffer)?,
            DataValue::Uint32(n) => Self::encode_uint(KIND_UINT32, *n as u128, buffer)?,
            DataValue::Map(m) => {
                Self::encode_header(KIND_MAP, m.len(), buffer)?;
                for (key, child) in sorted_pairs(m) {
                    Self::encode_header(KIND_STRING, key.len(), buffer)?;
                    buffer.extend_from_slice(key.as_bytes());
                    Self::encode_to_buffer(child, buffer)?;
                }
            }
            DataValue::Int32(n) => Self::encode_uint(KIND_INT32, *n as u32 as u128, buffer)?,
            DataValue::Uint64(n) => Self::encode_uint(KIND_UINT64, *n as u128, buffer)?,
            DataValue::Uint128(n) => Self::encode_uint(KIND_UINT128, *n, buffer)?,
            DataValue::Array(items) => {
                Self::encode_header(KIND_ARRAY, items.len(), buffer)?;
                for child in items {
                    Self::encode_to_buffer(child, buffer)?;
                }
            }
            DataValue::Bool(b) => Self::encode_header(KIND_BOOL, *b as usize, buffer)?,
            DataValue::Float(f) => {
                Self::encode_header(KIND_FLOAT, 4, buffer)?;
                buffer.extend_from_slice(&f.to_be_bytes());
            }
        }
        Ok(())
    }

    /// Integers drop their leading zero bytes
    fn encode_uint(kind: u8, value: u128, buffer: &mut Vec<u8>) -> Result<()> {
        let bytes = value.to_be_bytes();
        let skip = (value.leading_zeros() / 8) as usize;
        Self::encode_header(kind, bytes.len() - skip, buffer)?;
        buffer.extend_from_slice(&bytes[skip..]);
        Ok(())
    }

    /// Control byte, extended-type byte when needed, then size bytes
    fn encode_header(kind: u8, size: usize, buffer: &mut Vec<u8>) -> Result<()> {
        if size > MAX_SIZE {
            return Err(MmdbError::Build(format!(
                "Payload of {} bytes exceeds the {} byte limit",
                size, MAX_SIZE
            )));
        }

        let size_bits = if size < 29 {
            size as u8
        } else if size < 285 {
            29
        } else if size < 65_821 {
            30
        } else {
            31
        };

        if kind <= KIND_MAP {
            buffer.push((kind << 5) | size_bits);
        } else {
            buffer.push((KIND_EXTENDED << 5) | size_bits);
            buffer.push(kind - 7);
        }

        match size_bits {
            29 => buffer.push((size - 29) as u8),
            30 => buffer.extend_from_slice(&((size - 285) as u16).to_be_bytes()),
            31 => buffer.extend_from_slice(&((size - 65_821) as u32).to_be_bytes()[1..]),
            _ => {}
        }
        Ok(())
    }
}

impl Default for DataEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_pairs(m: &HashMap<String, DataValue>) -> Vec<(&String, &DataValue)> {
    let mut pairs: Vec<_> = m.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
}

/// Data section decoder
///
/// Decodes values from one region of a database. Pointer targets are
/// offsets from the start of that region.
pub struct DataDecoder<'a> {
    buffer: &'a [u8],
}

impl<'a> DataDecoder<'a> {
    /// Create a decoder over a data region
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    /// Decode the value at `offset`, following pointers
    pub fn decode(&self, offset: u32) -> Result<DataValue> {
        let mut cursor = ReadCursor::new(offset as usize);
        self.decode_with(&mut cursor)
    }

    /// Decode the value under `cursor`, following pointers
    ///
    /// On success the cursor sits just past the value. On failure it is
    /// put back where it started.
    pub fn decode_with(&self, cursor: &mut ReadCursor) -> Result<DataValue> {
        let start = cursor.position();
        let result = self.decode_value(cursor, 0);
        if result.is_err() {
            cursor.set_position(start);
        }
        result
    }

    /// Decode the value at `offset` without following a top-level pointer
    pub fn decode_shallow(&self, offset: u32) -> Result<DataValue> {
        let mut cursor = ReadCursor::new(offset as usize);
        self.decode_field(&mut cursor, 0)
    }

    fn decode_value(&self, cursor: &mut ReadCursor, depth: usize) -> Result<DataValue> {
        match self.decode_field(cursor, depth)? {
            DataValue::Pointer(target) => {
                cursor.resolve_pointer(target as usize, |c| match self.decode_field(c, depth + 1)? {
                    DataValue::Pointer(next) => Err(MmdbError::Decode(format!(
                        "Pointer to {} leads to another pointer ({})",
                        target, next
                    ))),
                    resolved => Ok(resolved),
                })
            }
            value => Ok(value),
        }
    }

    /// Decode exactly one field; nested values are resolved
    fn decode_field(&self, cursor: &mut ReadCursor, depth: usize) -> Result<DataValue> {
        if depth > MAX_DEPTH {
            return Err(MmdbError::Decode(format!(
                "Data nested deeper than {} levels",
                MAX_DEPTH
            )));
        }

        let ctrl_pos = cursor.position();
        let ctrl = cursor.next_byte(self.buffer)?;
        let mut kind = ctrl >> 5;

        if kind == POINTER_KIND {
            cursor.set_position(ctrl_pos);
            return Ok(DataValue::Pointer(pointer::decode_at(self.buffer, cursor)?));
        }

        if kind == KIND_EXTENDED {
            let ext = cursor.next_byte(self.buffer)?;
            if ext == 0 || ext > KIND_FLOAT - 7 {
                return Err(MmdbError::UnknownFieldKind(ext.saturating_add(7)));
            }
            kind = ext + 7;
        }

        let size = self.decode_size(cursor, ctrl & 0x1F)?;

        match kind {
            KIND_STRING => {
                let bytes = cursor.take(self.buffer, size)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| MmdbError::Decode(format!("Invalid UTF-8 in string: {}", e)))?;
                Ok(DataValue::String(s.to_string()))
            }
            KIND_DOUBLE => {
                let bytes = self.take_exact::<8>(cursor, size, "double")?;
                Ok(DataValue::Double(f64::from_be_bytes(bytes)))
            }
            KIND_BYTES => Ok(DataValue::Bytes(cursor.take(self.buffer, size)?.to_vec())),
            KIND_UINT16 => Ok(DataValue::Uint16(self.read_uint(cursor, size, 2)? as u16)),
            KIND_UINT32 => Ok(DataValue::Uint32(self.read_uint(cursor, size, 4)? as u32)),
            KIND_MAP => self.decode_map(cursor, size, depth),
            KIND_INT32 => Ok(DataValue::Int32(self.read_uint(cursor, size, 4)? as u32 as i32)),
            KIND_UINT64 => Ok(DataValue::Uint64(self.read_uint(cursor, size, 8)? as u64)),
            KIND_UINT128 => Ok(DataValue::Uint128(self.read_uint(cursor, size, 16)?)),
            KIND_ARRAY => self.decode_array(cursor, size, depth),
            KIND_BOOL => match size {
                0 => Ok(DataValue::Bool(false)),
                1 => Ok(DataValue::Bool(true)),
                _ => Err(MmdbError::Decode(format!("Invalid bool size {}", size))),
            },
            KIND_FLOAT => {
                let bytes = self.take_exact::<4>(cursor, size, "float")?;
                Ok(DataValue::Float(f32::from_be_bytes(bytes)))
            }
            other => Err(MmdbError::UnknownFieldKind(other)),
        }
    }

    fn decode_map(&self, cursor: &mut ReadCursor, count: usize, depth: usize) -> Result<DataValue> {
        let mut map = HashMap::with_capacity(count.min(self.remaining(cursor)));

        for _ in 0..count {
            let key = match self.decode_value(cursor, depth + 1)? {
                DataValue::String(s) => s,
                other => {
                    return Err(MmdbError::Decode(format!(
                        "Map key must be a string, found {:?}",
                        other
                    )))
                }
            };
            let value = self.decode_value(cursor, depth + 1)?;
            map.insert(key, value);
        }

        Ok(DataValue::Map(map))
    }

    fn decode_array(&self, cursor: &mut ReadCursor, count: usize, depth: usize) -> Result<DataValue> {
        let mut array = Vec::with_capacity(count.min(self.remaining(cursor)));

        for _ in 0..count {
            array.push(self.decode_value(cursor, depth + 1)?);
        }

        Ok(DataValue::Array(array))
    }

    fn read_uint(&self, cursor: &mut ReadCursor, size: usize, max: usize) -> Result<u128> {
        if size > max {
            return Err(MmdbError::Decode(format!(
                "Integer of {} bytes exceeds {} byte width",
                size, max
            )));
        }
        let bytes = cursor.take(self.buffer, size)?;
        Ok(bytes.iter().fold(0u128, |acc, &b| (acc << 8) | b as u128))
    }

    fn take_exact<const N: usize>(
        &self,
        cursor: &mut ReadCursor,
        size: usize,
        what: &str,
    ) -> Result<[u8; N]> {
        if size != N {
            return Err(MmdbError::Decode(format!(
                "Invalid {} size {} (expected {})",
                what, size, N
            )));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(cursor.take(self.buffer, N)?);
        Ok(out)
    }

    fn decode_size(&self, cursor: &mut ReadCursor, size_bits: u8) -> Result<usize> {
        let size = match size_bits {
            0..=28 => size_bits as usize,
            29 => 29 + cursor.next_byte(self.buffer)? as usize,
            30 => {
                let bytes = cursor.take(self.buffer, 2)?;
                285 + u16::from_be_bytes([bytes[0], bytes[1]]) as usize
            }
            _ => {
                let bytes = cursor.take(self.buffer, 3)?;
                65_821
                    + (((bytes[0] as usize) << 16) | ((bytes[1] as usize) << 8) | bytes[2] as usize)
            }
        };
        Ok(size)
    }

    fn remaining(&self, cursor: &ReadCursor) -> usize {
        self.buffer.len().saturating_sub(cursor.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_all_types() {
        let mut encoder = DataEncoder::new();

        let values = vec![
            DataValue::String("hello".to_string()),
            DataValue::Uint16(12345),
            DataValue::Uint32(0xDEADBEEF),
            DataValue::Uint64(0x123456789ABCDEF0),
            DataValue::Uint128(0x0123456789ABCDEF0123456789ABCDEF),
            DataValue::Int32(-42),
            DataValue::Int32(7),
            DataValue::Double(3.14159265359),
            DataValue::Float(2.71828),
            DataValue::Bool(true),
            DataValue::Bool(false),
            DataValue::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF]),
            DataValue::Uint32(0),
        ];

        let offsets: Vec<u32> = values.iter().map(|v| encoder.encode(v).unwrap()).collect();

        let bytes = encoder.into_bytes();
        let decoder = DataDecoder::new(&bytes);

        for (offset, expected) in offsets.iter().zip(values.iter()) {
            let decoded = decoder.decode(*offset).unwrap();
            assert_eq!(&decoded, expected);
        }
    }

    #[test]
    fn test_wire_layout() {
        assert_eq!(
            DataEncoder::inline_bytes(&DataValue::Uint16(5)).unwrap(),
            vec![0xA1, 0x05]
        );
        assert_eq!(DataEncoder::inline_bytes(&DataValue::Uint32(0)).unwrap(), vec![0xC0]);
        assert_eq!(
            DataEncoder::inline_bytes(&DataValue::Uint64(1)).unwrap(),
            vec![0x01, 0x02, 0x01]
        );
        assert_eq!(
            DataEncoder::inline_bytes(&DataValue::Bool(true)).unwrap(),
            vec![0x01, 0x07]
        );
        assert_eq!(
            DataEncoder::inline_bytes(&DataValue::String("en".to_string())).unwrap(),
            vec![0x42, b'e', b'n']
        );
        assert_eq!(
            DataEncoder::inline_bytes(&DataValue::Array(vec![])).unwrap(),
            vec![0x00, 0x04]
        );
    }

    #[test]
    fn test_encode_decode_map() {
        let mut encoder = DataEncoder::new();
        let mut map = HashMap::new();
        map.insert("country".to_string(), DataValue::String("US".to_string()));
        map.insert("asn".to_string(), DataValue::Uint32(13335));
        map.insert("score".to_string(), DataValue::Double(0.95));

        let value = DataValue::Map(map);
        let offset = encoder.encode(&value).unwrap();

        let bytes = encoder.into_bytes();
        let decoder = DataDecoder::new(&bytes);
        assert_eq!(decoder.decode(offset).unwrap(), value);
    }

    #[test]
    fn test_deduplication() {
        let mut encoder = DataEncoder::new();

        let value = DataValue::String("test".to_string());
        let offset1 = encoder.encode(&value).unwrap();
        let offset2 = encoder.encode(&value).unwrap();
        assert_eq!(offset1, offset2);

        let offset3 = encoder
            .encode(&DataValue::String("different".to_string()))
            .unwrap();
        assert_ne!(offset1, offset3);
    }

    #[test]
    fn test_shared_sub_values_become_pointers() {
        let city = DataValue::String("Aix-en-Provence, Bouches-du-Rhone".to_string());
        let mut first = HashMap::new();
        first.insert("city".to_string(), city.clone());
        first.insert("id".to_string(), DataValue::Uint32(1));
        let mut second = HashMap::new();
        second.insert("city".to_string(), city.clone());
        second.insert("id".to_string(), DataValue::Uint32(2));

        let first = DataValue::Map(first);
        let second = DataValue::Map(second);

        let mut encoder = DataEncoder::new();
        let off1 = encoder.encode(&first).unwrap();
        let off2 = encoder.encode(&second).unwrap();
        let bytes = encoder.into_bytes();

        let inline_len = DataEncoder::inline_bytes(&second).unwrap().len();
        assert!(bytes.len() - (off2 as usize) < inline_len, "second map should use pointers");

        let decoder = DataDecoder::new(&bytes);
        assert_eq!(decoder.decode(off1).unwrap(), first);
        assert_eq!(decoder.decode(off2).unwrap(), second);
    }

    #[test]
    fn test_pointer_leaves_cursor_after_container() {
        // [0] "shared"  [7] array of two pointers to 0  [13] uint16 9
        let mut bytes =
            DataEncoder::inline_bytes(&DataValue::String("shared".to_string())).unwrap();
        bytes.extend_from_slice(&[0x02, 0x04]);
        bytes.extend_from_slice(&pointer::encode(0));
        bytes.extend_from_slice(&pointer::encode(0));
        let tail = bytes.len();
        bytes.extend_from_slice(&[0xA1, 0x09]);

        let decoder = DataDecoder::new(&bytes);
        let mut cursor = ReadCursor::new(7);
        let value = decoder.decode_with(&mut cursor).unwrap();
        assert_eq!(
            value,
            DataValue::Array(vec![
                DataValue::String("shared".to_string()),
                DataValue::String("shared".to_string()),
            ])
        );
        assert_eq!(cursor.position(), tail);
        assert_eq!(decoder.decode_with(&mut cursor).unwrap(), DataValue::Uint16(9));
    }

    #[test]
    fn test_decode_shallow_keeps_pointer() {
        let mut bytes = DataEncoder::inline_bytes(&DataValue::Uint16(3)).unwrap();
        bytes.extend_from_slice(&pointer::encode(0));

        let decoder = DataDecoder::new(&bytes);
        assert_eq!(decoder.decode_shallow(2).unwrap(), DataValue::Pointer(0));
        assert_eq!(decoder.decode(2).unwrap(), DataValue::Uint16(3));
    }

    #[test]
    fn test_pointer_to_pointer_rejected() {
        let mut bytes = pointer::encode(2);
        bytes.extend_from_slice(&pointer::encode(0));
        let decoder = DataDecoder::new(&bytes);
        assert!(matches!(decoder.decode(0), Err(MmdbError::Decode(_))));
    }

    #[test]
    fn test_unknown_kinds() {
        // Extended kind 12 (data cache container) and 13 (end marker)
        let decoder = DataDecoder::new(&[0x00, 0x05]);
        assert_eq!(decoder.decode(0), Err(MmdbError::UnknownFieldKind(12)));
        let decoder = DataDecoder::new(&[0x00, 0x06]);
        assert_eq!(decoder.decode(0), Err(MmdbError::UnknownFieldKind(13)));
        let decoder = DataDecoder::new(&[0x00, 0x09]);
        assert_eq!(decoder.decode(0), Err(MmdbError::UnknownFieldKind(16)));
    }

    #[test]
    fn test_self_referencing_map_is_bounded() {
        // Map of one entry whose value points back at the map itself
        let mut bytes = vec![0xE1];
        bytes.extend_from_slice(&[0x41, b'k']);
        bytes.extend_from_slice(&pointer::encode(0));
        let decoder = DataDecoder::new(&bytes);
        assert!(matches!(decoder.decode(0), Err(MmdbError::Decode(_))));
    }

    #[test]
    fn test_cursor_restored_on_error() {
        // String claiming 5 bytes with only 2 present
        let bytes = [0xA1, 0x01, 0x45, b'a', b'b'];
        let decoder = DataDecoder::new(&bytes);
        let mut cursor = ReadCursor::new(2);
        assert!(decoder.decode_with(&mut cursor).is_err());
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_large_strings() {
        let mut encoder = DataEncoder::new();

        let short = "x".repeat(28);
        let medium = "x".repeat(100);
        let long = "x".repeat(1000);
        let huge = "x".repeat(70_000);

        let offsets: Vec<u32> = [&short, &medium, &long, &huge]
            .iter()
            .map(|s| encoder.encode(&DataValue::String((*s).clone())).unwrap())
            .collect();

        let bytes = encoder.into_bytes();
        let decoder = DataDecoder::new(&bytes);

        for (offset, expected) in offsets.iter().zip([short, medium, long, huge]) {
            assert_eq!(decoder.decode(*offset).unwrap(), DataValue::String(expected));
        }
    }

    #[test]
    fn test_oversized_integer_rejected() {
        // uint16 claiming 3 bytes
        let decoder = DataDecoder::new(&[0xA3, 1, 2, 3]);
        assert!(matches!(decoder.decode(0), Err(MmdbError::Decode(_))));
    }

    #[test]
    fn test_largest_size_field() {
        let mut buffer = Vec::new();
        DataEncoder::encode_header(KIND_BYTES, MAX_SIZE, &mut buffer).unwrap();
        assert_eq!(buffer, vec![0x9F, 0xFF, 0xFF, 0xFF]);
        assert!(DataEncoder::encode_header(KIND_BYTES, MAX_SIZE + 1, &mut buffer).is_err());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let mut encoder = DataEncoder::new();
        let huge = DataValue::Bytes(vec![0u8; MAX_SIZE + 1]);
        assert!(matches!(encoder.encode(&huge), Err(MmdbError::Build(_))));
        assert_eq!(encoder.size(), 0);

        // Nested inside a map it fails the same way
        let mut map = HashMap::new();
        map.insert("blob".to_string(), huge);
        assert!(matches!(
            encoder.encode(&DataValue::Map(map)),
            Err(MmdbError::Build(_))
        ));
    }
}
