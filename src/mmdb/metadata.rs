//! Database metadata
//!
//! The metadata region is a single map in the data-section encoding. It
//! describes the tree shape (`node_count`, `record_size`, `ip_version`) and
//! the file's provenance.

use super::types::{IpVersion, RecordSize};
use crate::data_section::{DataDecoder, DataEncoder, DataValue};
use crate::error::{MmdbError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default `database_type` written by new databases
pub const DEFAULT_DATABASE_TYPE: &str = "mmdbkit";

/// Default English description written by new databases
pub const DEFAULT_DESCRIPTION: &str = "IP prefix database built with mmdbkit";

/// Parsed metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Bits per child reference
    pub record_size: RecordSize,
    /// Address family the tree was built for
    pub ip_version: IpVersion,
    /// Language tags used by `description` and the records
    pub languages: Vec<String>,
    /// Number of nodes in the search tree
    pub node_count: u32,
    /// Format major version
    pub binary_format_major_version: u16,
    /// Format minor version
    pub binary_format_minor_version: u16,
    /// Build time, seconds since the Unix epoch
    pub build_epoch: u64,
    /// Free-form database type name
    pub database_type: String,
    /// Description text keyed by language tag
    pub description: BTreeMap<String, String>,
}

impl Metadata {
    /// Metadata for a new database: 28-bit records, IPv6, English
    pub fn new() -> Self {
        let build_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut description = BTreeMap::new();
        description.insert("en".to_string(), DEFAULT_DESCRIPTION.to_string());

        Self {
            record_size: RecordSize::Bits28,
            ip_version: IpVersion::V6,
            languages: vec!["en".to_string()],
            node_count: 0,
            binary_format_major_version: 2,
            binary_format_minor_version: 0,
            build_epoch,
            database_type: DEFAULT_DATABASE_TYPE.to_string(),
            description,
        }
    }

    /// Parse the bytes that follow the metadata marker
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value = DataDecoder::new(bytes)
            .decode(0)
            .map_err(|e| MmdbError::InvalidMetadata(format!("Failed to decode metadata: {}", e)))?;
        Self::from_value(&value)
    }

    /// Build from an already decoded metadata map
    pub fn from_value(value: &DataValue) -> Result<Self> {
        let map = value
            .as_map()
            .ok_or_else(|| MmdbError::InvalidMetadata("Metadata is not a map".to_string()))?;

        let node_count = extract_uint(map, "node_count")?;
        let node_count = u32::try_from(node_count).map_err(|_| {
            MmdbError::InvalidMetadata(format!("node_count {} does not fit in 32 bits", node_count))
        })?;
        let record_size = RecordSize::from_bits(extract_uint(map, "record_size")?)?;
        let ip_version = IpVersion::from_number(extract_uint(map, "ip_version")?)?;

        let defaults = Self::new();

        let languages = match map.get("languages") {
            Some(DataValue::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        MmdbError::InvalidMetadata("Language tag is not a string".to_string())
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(MmdbError::InvalidMetadata(
                    "Field 'languages' is not an array".to_string(),
                ))
            }
            None => Vec::new(),
        };

        let description = match map.get("description") {
            Some(DataValue::Map(entries)) => entries
                .iter()
                .map(|(lang, text)| {
                    text.as_str()
                        .map(|t| (lang.clone(), t.to_string()))
                        .ok_or_else(|| {
                            MmdbError::InvalidMetadata(format!(
                                "Description for '{}' is not a string",
                                lang
                            ))
                        })
                })
                .collect::<Result<BTreeMap<_, _>>>()?,
            Some(_) => {
                return Err(MmdbError::InvalidMetadata(
                    "Field 'description' is not a map".to_string(),
                ))
            }
            None => BTreeMap::new(),
        };

        Ok(Self {
            record_size,
            ip_version,
            languages,
            node_count,
            binary_format_major_version: optional_uint(map, "binary_format_major_version")?
                .map_or(Ok(defaults.binary_format_major_version), narrow_u16)?,
            binary_format_minor_version: optional_uint(map, "binary_format_minor_version")?
                .map_or(Ok(defaults.binary_format_minor_version), narrow_u16)?,
            build_epoch: optional_uint(map, "build_epoch")?.unwrap_or(0),
            database_type: map
                .get("database_type")
                .and_then(DataValue::as_str)
                .unwrap_or_default()
                .to_string(),
            description,
        })
    }

    /// Metadata as a data-section map
    pub fn to_value(&self) -> DataValue {
        let mut map = HashMap::new();
        map.insert(
            "binary_format_major_version".to_string(),
            DataValue::Uint16(self.binary_format_major_version),
        );
        map.insert(
            "binary_format_minor_version".to_string(),
            DataValue::Uint16(self.binary_format_minor_version),
        );
        map.insert("build_epoch".to_string(), DataValue::Uint64(self.build_epoch));
        map.insert(
            "database_type".to_string(),
            DataValue::String(self.database_type.clone()),
        );
        map.insert(
            "description".to_string(),
            DataValue::Map(
                self.description
                    .iter()
                    .map(|(k, v)| (k.clone(), DataValue::String(v.clone())))
                    .collect(),
            ),
        );
        map.insert(
            "languages".to_string(),
            DataValue::Array(
                self.languages
                    .iter()
                    .map(|l| DataValue::String(l.clone()))
                    .collect(),
            ),
        );
        map.insert(
            "ip_version".to_string(),
            DataValue::Uint16(self.ip_version.as_u16()),
        );
        map.insert("node_count".to_string(), DataValue::Uint32(self.node_count));
        map.insert(
            "record_size".to_string(),
            DataValue::Uint16(self.record_size.bits()),
        );
        DataValue::Map(map)
    }

    /// Encoded metadata map, without the marker
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut encoder = DataEncoder::new();
        encoder.encode(&self.to_value())?;
        Ok(encoder.into_bytes())
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_uint(map: &HashMap<String, DataValue>, key: &str) -> Result<u64> {
    optional_uint(map, key)?.ok_or_else(|| {
        MmdbError::InvalidMetadata(format!("Required field '{}' not found", key))
    })
}

fn optional_uint(map: &HashMap<String, DataValue>, key: &str) -> Result<Option<u64>> {
    match map.get(key) {
        None => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            MmdbError::InvalidMetadata(format!("Field '{}' is not an unsigned integer", key))
        }),
    }
}

fn narrow_u16(n: u64) -> Result<u16> {
    u16::try_from(n)
        .map_err(|_| MmdbError::InvalidMetadata(format!("Version {} out of range", n)))
}
