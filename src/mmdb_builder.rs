//! MMDB Database Builder
//!
//! Collects networks and their records, then writes a complete database:
//! data section first (so every record has an offset), then the prefix tree,
//! then the envelope with its metadata.

use crate::data_section::{DataEncoder, DataValue};
use crate::error::{MmdbError, Result};
use crate::ip_tree_builder::IpTreeBuilder;
use crate::mmdb::metadata::Metadata;
use crate::mmdb::types::{IpVersion, RecordSize, DATA_SEPARATOR_LEN};
use crate::mmdb::{serialize, PrefixTree};
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

/// One network and the record stored for it
#[derive(Debug, Clone)]
pub struct NetworkEntry {
    /// Network address; host bits past the prefix are ignored
    pub addr: IpAddr,
    /// Prefix length (0-32 for IPv4, 0-128 for IPv6)
    pub prefix_len: u8,
    /// Record returned for addresses in the network
    pub data: DataValue,
}

/// Database builder
///
/// # Example
/// ```
/// use mmdbkit::{Database, DataValue, MmdbBuilder};
/// use std::collections::HashMap;
///
/// let mut builder = MmdbBuilder::new().with_database_type("Example-Country");
///
/// let mut record = HashMap::new();
/// record.insert("country".to_string(), DataValue::String("NL".to_string()));
/// builder.add_ip("192.0.2.0/24", record)?;
///
/// let db = Database::from_bytes(builder.build()?)?;
/// let found = db.lookup("192.0.2.55")?.unwrap();
/// assert_eq!(found.prefix_len, 24);
/// # Ok::<(), mmdbkit::MmdbError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MmdbBuilder {
    entries: Vec<NetworkEntry>,
    /// Fixed record size; the narrowest that fits is chosen when unset
    record_size: Option<RecordSize>,
    /// Fixed address family; IPv6 when any entry is IPv6 when unset
    ip_version: Option<IpVersion>,
    /// Optional custom database type name
    database_type: Option<String>,
    /// Optional custom description (language -> text)
    description: BTreeMap<String, String>,
    languages: Option<Vec<String>>,
}

impl MmdbBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed record size instead of the narrowest that fits
    pub fn with_record_size(mut self, record_size: RecordSize) -> Self {
        self.record_size = Some(record_size);
        self
    }

    /// Build a tree for a fixed address family
    ///
    /// An IPv4 tree rejects IPv6 networks at build time.
    pub fn with_ip_version(mut self, ip_version: IpVersion) -> Self {
        self.ip_version = Some(ip_version);
        self
    }

    /// Set a custom database type name
    pub fn with_database_type(mut self, db_type: impl Into<String>) -> Self {
        self.database_type = Some(db_type.into());
        self
    }

    /// Add a description in a specific language
    ///
    /// Can be called multiple times for different languages.
    /// If not called, defaults to an English description.
    pub fn with_description(
        mut self,
        language: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.description.insert(language.into(), text.into());
        self
    }

    /// Set the language tags recorded in metadata
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }

    /// Add an IP address or CIDR block with a map record
    ///
    /// A bare address is a host route (/32 or /128).
    pub fn add_ip(&mut self, key: &str, data: HashMap<String, DataValue>) -> Result<()> {
        let (addr, prefix_len) = parse_network(key)?;
        self.add_network(addr, prefix_len, DataValue::Map(data))
    }

    /// Add a network with any record value
    pub fn add_network(&mut self, addr: IpAddr, prefix_len: u8, data: DataValue) -> Result<()> {
        let max_prefix = if addr.is_ipv4() { 32 } else { 128 };
        if prefix_len > max_prefix {
            return Err(MmdbError::InvalidIpAddress(format!(
                "Prefix length {} exceeds {} for {}",
                prefix_len, max_prefix, addr
            )));
        }

        self.entries.push(NetworkEntry {
            addr,
            prefix_len,
            data,
        });
        Ok(())
    }

    /// Build the database
    pub fn build(&self) -> Result<Vec<u8>> {
        let ip_version = self.ip_version.unwrap_or_else(|| {
            if self.entries.iter().any(|e| e.addr.is_ipv6()) {
                IpVersion::V6
            } else {
                IpVersion::V4
            }
        });

        // Encode records first: the tree stores their offsets
        let mut data_encoder = DataEncoder::new();
        let offsets = self
            .entries
            .iter()
            .map(|entry| data_encoder.encode(&entry.data))
            .collect::<Result<Vec<u32>>>()?;
        let data_section = data_encoder.into_bytes();

        let mut tree_builder =
            IpTreeBuilder::new(ip_version, self.record_size.unwrap_or(RecordSize::Bits32));
        tree_builder.reserve_nodes(self.entries.len() * 2);
        for (entry, &offset) in self.entries.iter().zip(&offsets) {
            tree_builder.insert(entry.addr, entry.prefix_len, offset)?;
        }
        if self.record_size.is_none() {
            let fitted = narrowest_record_size(tree_builder.node_count(), data_section.len())?;
            tree_builder.set_record_size(fitted);
        }

        let mut metadata = Metadata {
            record_size: tree_builder.record_size(),
            ip_version,
            ..Metadata::new()
        };
        if let Some(db_type) = &self.database_type {
            metadata.database_type = db_type.clone();
        }
        if !self.description.is_empty() {
            metadata.description = self.description.clone();
        }
        if let Some(languages) = &self.languages {
            metadata.languages = languages.clone();
        }

        let database = serialize(&tree_builder, &data_section, &mut metadata)?;

        tracing::debug!(
            entries = self.entries.len(),
            node_count = metadata.node_count,
            record_size = metadata.record_size.bits(),
            ip_version = metadata.ip_version.as_u16(),
            data_bytes = data_section.len(),
            total_bytes = database.len(),
            "built database"
        );

        Ok(database)
    }

    /// Get statistics about the builder
    pub fn stats(&self) -> BuilderStats {
        let ipv4_entries = self.entries.iter().filter(|e| e.addr.is_ipv4()).count();
        BuilderStats {
            total_entries: self.entries.len(),
            ipv4_entries,
            ipv6_entries: self.entries.len() - ipv4_entries,
        }
    }
}

/// Builder statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderStats {
    /// Total number of entries added
    pub total_entries: usize,
    /// Number of IPv4 networks
    pub ipv4_entries: usize,
    /// Number of IPv6 networks
    pub ipv6_entries: usize,
}

/// Parse `addr` or `addr/prefix`
pub fn parse_network(key: &str) -> Result<(IpAddr, u8)> {
    let key = key.trim();

    if let Ok(addr) = key.parse::<IpAddr>() {
        let prefix_len = if addr.is_ipv4() { 32 } else { 128 };
        return Ok((addr, prefix_len));
    }

    let invalid = || MmdbError::InvalidIpAddress(format!("Not an IP address or CIDR: {}", key));
    let (addr_str, prefix_str) = key.split_once('/').ok_or_else(invalid)?;
    let addr = addr_str.parse::<IpAddr>().map_err(|_| invalid())?;
    let prefix_len = prefix_str.parse::<u8>().map_err(|_| invalid())?;

    let max_prefix = if addr.is_ipv4() { 32 } else { 128 };
    if prefix_len > max_prefix {
        return Err(MmdbError::InvalidIpAddress(format!(
            "Prefix length {} exceeds {} in {}",
            prefix_len, max_prefix, key
        )));
    }
    Ok((addr, prefix_len))
}

/// Smallest record size able to hold every node and leaf value
fn narrowest_record_size(node_count: u32, data_len: usize) -> Result<RecordSize> {
    // Leaves are node_count + 16 + offset, and every offset is below data_len
    let largest = node_count as u64 + DATA_SEPARATOR_LEN as u64 + data_len as u64;
    [RecordSize::Bits24, RecordSize::Bits28, RecordSize::Bits32]
        .into_iter()
        .find(|size| largest <= size.max_record_value() as u64)
        .ok_or_else(|| {
            MmdbError::Build(format!(
                "{} nodes and {} data bytes do not fit in 32-bit records",
                node_count, data_len
            ))
        })
}
