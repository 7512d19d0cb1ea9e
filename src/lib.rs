//! mmdbkit - Reader and Writer for MaxMind-style IP Prefix Databases
//!
//! mmdbkit builds and queries databases that map IPv4 and IPv6 networks to
//! structured records, using the MaxMind DB binary layout: a binary prefix
//! tree, a deduplicated data section and a metadata map.
//!
//! # Quick Start
//!
//! ```rust
//! use mmdbkit::{Database, DatabaseBuilder, DataValue};
//! use std::collections::HashMap;
//!
//! let mut builder = DatabaseBuilder::new();
//!
//! let mut data = HashMap::new();
//! data.insert("threat_level".to_string(), DataValue::String("high".to_string()));
//! builder.add_ip("1.2.3.0/24", data)?;
//!
//! let mut data = HashMap::new();
//! data.insert("owner".to_string(), DataValue::String("docs".to_string()));
//! builder.add_ip("2001:db8::/32", data)?;
//!
//! let db = Database::from_bytes(builder.build()?)?;
//!
//! if let Some(result) = db.lookup("1.2.3.4")? {
//!     assert_eq!(result.prefix_len, 24);
//!     println!("Found: {:?}", result.data);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │  Database File Format                │
//! ├──────────────────────────────────────┤
//! │  1. Search Tree (binary trie)        │
//! │  2. 16 zero bytes                    │
//! │  3. Data Section (deduplicated)      │
//! │  4. "\xAB\xCD\xEFMaxMind.com"        │
//! │  5. Metadata                         │
//! └──────────────────────────────────────┘
//!          ↓ mmap()
//! ┌──────────────────────────────────────┐
//! │  Memory (read-only, shared)          │
//! │  Ready for queries immediately       │
//! └──────────────────────────────────────┘
//! ```
//!
//! Nothing is parsed up front beyond the metadata. Each lookup walks at most
//! 128 tree levels and decodes one record with a cursor of its own, so a
//! [`Database`] can serve many threads at once.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Read position within a buffer
pub mod cursor;
/// Data section encoding/decoding
pub mod data_section;
/// Database API
pub mod database;
/// Error types for database operations
pub mod error;
/// IP tree builder for MMDB format
pub mod ip_tree_builder;
/// MMDB layout: envelope, metadata, search tree
pub mod mmdb;
/// Database builder
pub mod mmdb_builder;
/// Data-section pointer codec
pub mod pointer;

// Re-exports for Rust consumers

/// Database for IP lookups
pub use crate::database::{Database, QueryResult};

/// Data value type for database entries
pub use crate::data_section::DataValue;

pub use crate::error::{MmdbError, Result};
pub use crate::mmdb::{Envelope, IpVersion, Metadata, RecordSize};
pub use crate::mmdb_builder::MmdbBuilder;

/// Database builder
///
/// # Example
/// ```rust
/// use mmdbkit::{DatabaseBuilder, DataValue, RecordSize};
/// use std::collections::HashMap;
///
/// let mut builder = DatabaseBuilder::new()
///     .with_record_size(RecordSize::Bits28)
///     .with_database_type("Example-ThreatIntel");
///
/// let mut data = HashMap::new();
/// data.insert("threat_level".to_string(), DataValue::String("high".to_string()));
/// builder.add_ip("1.2.3.4", data)?;
///
/// let db_bytes = builder.build()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub use crate::mmdb_builder::MmdbBuilder as DatabaseBuilder;

// Version information
/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with("0.3"));
    }
}
