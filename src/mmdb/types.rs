//! MMDB-specific Type Definitions

use crate::error::{MmdbError, Result};
use serde::{Serialize, Serializer};

/// MMDB metadata marker: "\xAB\xCD\xEFMaxMind.com"
pub const METADATA_MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

/// Separator between the search tree and the data section
pub const DATA_SEPARATOR: [u8; 16] = [0u8; 16];

/// Width of [`DATA_SEPARATOR`], also the bias folded into leaf records
pub const DATA_SEPARATOR_LEN: u32 = 16;

/// IP version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    /// IPv4 only
    V4,
    /// IPv6 (may include IPv4 under ::/96)
    V6,
}

impl IpVersion {
    /// Numeric form stored in metadata
    pub fn as_u16(self) -> u16 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }

    /// Parse the numeric metadata form
    pub fn from_number(n: u64) -> Result<Self> {
        match n {
            4 => Ok(IpVersion::V4),
            6 => Ok(IpVersion::V6),
            _ => Err(MmdbError::InvalidMetadata(format!(
                "Invalid IP version: {}",
                n
            ))),
        }
    }
}

impl Serialize for IpVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

/// Record size in bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSize {
    /// 24-bit records (3 bytes per record, 6 bytes per node)
    Bits24 = 24,
    /// 28-bit records (3.5 bytes per record, 7 bytes per node)
    Bits28 = 28,
    /// 32-bit records (4 bytes per record, 8 bytes per node)
    Bits32 = 32,
}

impl RecordSize {
    /// Number of bits per record
    pub fn bits(self) -> u16 {
        self as u16
    }

    /// Get the size of a node (2 records) in bytes
    ///
    /// Two whole-byte halves, plus one shared byte when the record width
    /// is not a multiple of 8.
    pub fn node_bytes(self) -> usize {
        let bits = self.bits() as usize;
        2 * (bits / 8) + usize::from(bits % 8 != 0)
    }

    /// Largest value a single record can hold
    pub fn max_record_value(self) -> u32 {
        match self {
            RecordSize::Bits24 => (1 << 24) - 1,
            RecordSize::Bits28 => (1 << 28) - 1,
            RecordSize::Bits32 => u32::MAX,
        }
    }

    /// Create from bit size
    pub fn from_bits(bits: u64) -> Result<Self> {
        match bits {
            24 => Ok(RecordSize::Bits24),
            28 => Ok(RecordSize::Bits28),
            32 => Ok(RecordSize::Bits32),
            _ => Err(MmdbError::InvalidMetadata(format!(
                "Invalid record size: {} bits",
                bits
            ))),
        }
    }
}

impl Serialize for RecordSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.bits())
    }
}
