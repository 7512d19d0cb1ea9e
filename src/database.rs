//! Database API
//!
//! Opens a database file (memory-mapped) or an in-memory buffer and answers
//! IP lookups. Region boundaries and metadata are parsed once at open time;
//! every lookup afterwards walks the tree and decodes its record with its own
//! cursor, so a `Database` can be shared freely between threads.

use crate::data_section::DataValue;
use crate::error::{MmdbError, Result};
use crate::mmdb::{Envelope, IpVersion, Metadata, Sections};
use memmap2::Mmap;
use std::fs::File;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

/// Leading zero bits in front of an IPv4 address stored in an IPv6 tree
const IPV4_SUBTREE_BITS: u8 = 96;

/// Result of a successful lookup
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// The record stored for the matching network
    pub data: DataValue,
    /// Network prefix length (CIDR), in the queried address family
    ///
    /// For an IPv4 query against an IPv6 tree this is the tree depth minus
    /// 96. A match on an IPv6 network shorter than /96 (for example `::/64`)
    /// covers every IPv4 address and is reported as 0. The raw tree depth is
    /// available from [`Database::lookup_address`].
    pub prefix_len: u8,
    /// Offset of the record within the data section
    pub data_offset: u32,
}

/// Storage for database data - either owned or memory-mapped
enum DatabaseStorage {
    Owned(Vec<u8>),
    Mmap(Mmap),
}

impl DatabaseStorage {
    fn as_slice(&self) -> &[u8] {
        match self {
            DatabaseStorage::Owned(v) => v.as_slice(),
            DatabaseStorage::Mmap(m) => &m[..],
        }
    }
}

/// IP prefix database
///
/// # Examples
///
/// ```no_run
/// use mmdbkit::Database;
///
/// let db = Database::open("networks.mmdb")?;
///
/// if let Some(result) = db.lookup("1.2.3.4")? {
///     println!("/{}: {:?}", result.prefix_len, result.data);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Database {
    data: DatabaseStorage,
    sections: Sections,
    metadata: Metadata,
}

impl Database {
    /// Open a database file using memory mapping
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| MmdbError::Io(format!("Failed to open {}: {}", path.display(), e)))?;

        // SAFETY: the map is read-only; modifying the file while it is open
        // is outside what this type supports
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| MmdbError::Io(format!("Failed to mmap {}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), len = mmap.len(), "mapped database");
        Self::from_storage(DatabaseStorage::Mmap(mmap))
    }

    /// Create database from raw bytes
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_storage(DatabaseStorage::Owned(data))
    }

    fn from_storage(storage: DatabaseStorage) -> Result<Self> {
        let envelope = Envelope::load(storage.as_slice())?;
        let sections = envelope.sections();
        let metadata = envelope.into_metadata();

        Ok(Self {
            data: storage,
            sections,
            metadata,
        })
    }

    /// Parsed metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Region view over the underlying buffer
    pub fn envelope(&self) -> Envelope<'_> {
        Envelope::from_parts(self.data.as_slice(), self.sections, &self.metadata)
    }

    /// Total size of the database in bytes
    pub fn len(&self) -> usize {
        self.data.as_slice().len()
    }

    /// Whether the database buffer is empty (never true for a loaded database)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up an IP address given as text
    ///
    /// Returns `Ok(None)` when no network covers the address.
    pub fn lookup(&self, query: &str) -> Result<Option<QueryResult>> {
        let addr = query.trim().parse::<IpAddr>().map_err(|_| {
            MmdbError::InvalidIpAddress(format!("Not an IP address: {}", query))
        })?;
        self.lookup_ip(addr)
    }

    /// Look up an IP address
    ///
    /// IPv4 addresses (including IPv4-mapped IPv6 ones) are placed where the
    /// tree keeps IPv4 networks, and the reported prefix length is in IPv4
    /// terms, clamped at 0 when the matching network is wider than the IPv4
    /// subtree.
    pub fn lookup_ip(&self, addr: IpAddr) -> Result<Option<QueryResult>> {
        let (key, prefix_bias) = self.normalize(addr)?;
        Ok(self.lookup_address(&key)?.map(|mut result| {
            result.prefix_len = result.prefix_len.saturating_sub(prefix_bias);
            result
        }))
    }

    /// Look up a raw 16-byte tree key
    pub fn lookup_address(&self, address: &[u8; 16]) -> Result<Option<QueryResult>> {
        let envelope = self.envelope();
        let found = match envelope.query(address)? {
            Some(found) => found,
            None => return Ok(None),
        };

        let data = envelope.decode(found.data_offset)?;
        Ok(Some(QueryResult {
            data,
            prefix_len: found.prefix_len,
            data_offset: found.data_offset,
        }))
    }

    /// Map an address to its tree key and the number of leading key bits
    /// that are not part of the queried address
    fn normalize(&self, addr: IpAddr) -> Result<([u8; 16], u8)> {
        let v4 = match addr {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => v4,
                None if self.metadata.ip_version == IpVersion::V6 => return Ok((v6.octets(), 0)),
                None => {
                    return Err(MmdbError::InvalidIpAddress(format!(
                        "Cannot look up IPv6 address {} in an IPv4 database",
                        v6
                    )))
                }
            },
        };

        Ok(match self.metadata.ip_version {
            IpVersion::V6 => (ipv4_subtree_key(v4), IPV4_SUBTREE_BITS),
            IpVersion::V4 => (ipv4_tree_key(v4), 0),
        })
    }
}

/// `::a.b.c.d`
fn ipv4_subtree_key(addr: Ipv4Addr) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[12..].copy_from_slice(&addr.octets());
    key
}

/// Address bits first; an IPv4 tree never looks past bit 32
fn ipv4_tree_key(addr: Ipv4Addr) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..4].copy_from_slice(&addr.octets());
    key
}
