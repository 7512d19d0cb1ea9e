//! MaxMind DB (MMDB) layout
//!
//! ## Architecture
//!
//! - **types**: constants, record sizes, address families
//! - **metadata**: the metadata record and its codec
//! - **tree**: search tree traversal for IP lookups
//! - **envelope**: locating and assembling the three file regions
//!
//! Data decoding lives in `crate::data_section`; the tree and envelope only
//! deal in offsets.

pub mod envelope;
pub mod metadata;
pub mod tree;
pub mod types;

pub use envelope::{serialize, Envelope, PrefixTree, Sections};
pub use metadata::Metadata;
pub use tree::{LookupResult, SearchTree};
pub use types::{IpVersion, RecordSize, DATA_SEPARATOR, METADATA_MARKER};
