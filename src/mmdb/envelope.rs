//! File envelope: locating and assembling the three regions
//!
//! ```text
//! ┌──────────────────────────────┐  0
//! │ search tree (node_count × w) │
//! ├──────────────────────────────┤  tree_end
//! │ 16 zero bytes                │
//! ├──────────────────────────────┤  data_start
//! │ data section                 │
//! ├──────────────────────────────┤  data_end
//! │ \xAB\xCD\xEFMaxMind.com      │
//! ├──────────────────────────────┤  meta_start
//! │ metadata map                 │
//! └──────────────────────────────┘  len
//! ```
//!
//! Boundaries are found, not stored: the data section starts after the
//! first run of 16 zero bytes, the metadata after the last marker.

use super::metadata::Metadata;
use super::tree::{LookupResult, SearchTree};
use super::types::{RecordSize, DATA_SEPARATOR, METADATA_MARKER};
use crate::data_section::{DataDecoder, DataValue};
use crate::error::{MmdbError, Result};
use memchr::memmem;
use std::borrow::Cow;

/// A constructed prefix tree that can be written into an envelope
pub trait PrefixTree {
    /// Number of nodes `to_bytes` emits
    fn node_count(&self) -> u32;

    /// Width of each child reference
    fn record_size(&self) -> RecordSize;

    /// Serialized node records, `node_count × node_bytes` long
    fn to_bytes(&self) -> Result<Vec<u8>>;
}

/// Byte offsets of the region boundaries within a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sections {
    /// End of the tree region (start of the zero separator)
    pub tree_end: usize,
    /// First byte of the data region
    pub data_start: usize,
    /// First byte of the metadata marker
    pub data_end: usize,
    /// First byte of the metadata map
    pub meta_start: usize,
}

impl Sections {
    /// Find the separators in `buffer`
    pub fn locate(buffer: &[u8]) -> Result<Self> {
        let tree_end = memmem::find(buffer, &DATA_SEPARATOR).ok_or_else(|| {
            MmdbError::MalformedEnvelope("data section separator not found".to_string())
        })?;
        let data_start = tree_end + DATA_SEPARATOR.len();

        let marker = memmem::rfind(&buffer[data_start..], METADATA_MARKER).ok_or_else(|| {
            MmdbError::MalformedEnvelope("metadata marker not found".to_string())
        })?;
        let data_end = data_start + marker;

        Ok(Self {
            tree_end,
            data_start,
            data_end,
            meta_start: data_end + METADATA_MARKER.len(),
        })
    }

    /// Reconcile the located separator with the tree size from metadata
    ///
    /// A tree whose last bytes are zero makes the first zero run start
    /// early, and a tree holding 16 zero bytes makes it start inside the
    /// tree. Either way the separator must sit right after `tree_size`.
    pub fn anchor_tree(self, buffer: &[u8], tree_size: usize) -> Result<Self> {
        if tree_size == self.tree_end {
            return Ok(self);
        }

        let separator_end = tree_size + DATA_SEPARATOR.len();
        if separator_end <= self.data_end
            && buffer.get(tree_size..separator_end) == Some(&DATA_SEPARATOR[..])
        {
            tracing::debug!(
                located = self.tree_end,
                anchored = tree_size,
                "re-anchored tree end from metadata"
            );
            return Ok(Self {
                tree_end: tree_size,
                data_start: separator_end,
                ..self
            });
        }

        Err(MmdbError::MalformedEnvelope(format!(
            "no data section separator after a tree of {} bytes (first zero run at {})",
            tree_size, self.tree_end
        )))
    }
}

/// A loaded database buffer split into its regions
///
/// Regions are borrowed from the buffer; nothing is copied.
#[derive(Debug, Clone)]
pub struct Envelope<'a> {
    buffer: &'a [u8],
    sections: Sections,
    metadata: Cow<'a, Metadata>,
}

impl<'a> Envelope<'a> {
    /// Locate the regions of `buffer` and parse its metadata
    pub fn load(buffer: &'a [u8]) -> Result<Self> {
        let sections = Sections::locate(buffer)?;

        tracing::debug!(
            tree_end = sections.tree_end,
            data_start = sections.data_start,
            data_end = sections.data_end,
            meta_start = sections.meta_start,
            len = buffer.len(),
            "located envelope regions"
        );

        let metadata = Metadata::from_bytes(&buffer[sections.meta_start..])?;

        let tree_size = (metadata.node_count as usize)
            .checked_mul(metadata.record_size.node_bytes())
            .filter(|&size| size < sections.data_end)
            .ok_or_else(|| {
                MmdbError::MalformedEnvelope(format!(
                    "{} nodes of {} bytes do not fit before the metadata marker",
                    metadata.node_count,
                    metadata.record_size.node_bytes(),
                ))
            })?;
        let sections = sections.anchor_tree(buffer, tree_size)?;

        tracing::debug!(
            node_count = metadata.node_count,
            record_size = metadata.record_size.bits(),
            tree_size,
            "parsed metadata"
        );

        Ok(Self {
            buffer,
            sections,
            metadata: Cow::Owned(metadata),
        })
    }

    /// Rebuild a view from previously located sections
    pub fn from_parts(buffer: &'a [u8], sections: Sections, metadata: &'a Metadata) -> Self {
        Self {
            buffer,
            sections,
            metadata: Cow::Borrowed(metadata),
        }
    }

    /// Search tree region
    pub fn tree(&self) -> &'a [u8] {
        &self.buffer[..self.sections.tree_end]
    }

    /// Data region
    pub fn data(&self) -> &'a [u8] {
        &self.buffer[self.sections.data_start..self.sections.data_end]
    }

    /// Metadata region, after the marker
    pub fn metadata_bytes(&self) -> &'a [u8] {
        &self.buffer[self.sections.meta_start..]
    }

    /// Parsed metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Take ownership of the parsed metadata
    pub fn into_metadata(self) -> Metadata {
        self.metadata.into_owned()
    }

    /// Region boundaries
    pub fn sections(&self) -> Sections {
        self.sections
    }

    /// Width of one tree node in bytes
    pub fn node_byte_width(&self) -> usize {
        self.metadata.record_size.node_bytes()
    }

    /// Tree walker over this envelope
    pub fn search_tree(&self) -> SearchTree<'a> {
        SearchTree::new(self.tree(), self.data().len(), &self.metadata)
    }

    /// Find the data offset for a 16-byte address
    pub fn query(&self, address: &[u8; 16]) -> Result<Option<LookupResult>> {
        self.search_tree().lookup(address)
    }

    /// Decode the data-section value at `offset`
    pub fn decode(&self, offset: u32) -> Result<DataValue> {
        DataDecoder::new(self.data()).decode(offset)
    }

    /// Find and decode the record for a 16-byte address
    pub fn query_value(&self, address: &[u8; 16]) -> Result<Option<DataValue>> {
        match self.query(address)? {
            Some(found) => self.decode(found.data_offset).map(Some),
            None => Ok(None),
        }
    }
}

/// Assemble a database buffer
///
/// `metadata.node_count` is taken from `tree`; its record size must match
/// the tree's.
pub fn serialize<T: PrefixTree + ?Sized>(
    tree: &T,
    data_section: &[u8],
    metadata: &mut Metadata,
) -> Result<Vec<u8>> {
    if tree.record_size() != metadata.record_size {
        return Err(MmdbError::InvalidMetadata(format!(
            "Metadata record size {} does not match tree record size {}",
            metadata.record_size.bits(),
            tree.record_size().bits()
        )));
    }

    let tree_bytes = tree.to_bytes()?;
    let expected = tree.node_count() as usize * tree.record_size().node_bytes();
    if tree_bytes.len() != expected {
        return Err(MmdbError::Build(format!(
            "Tree emitted {} bytes, expected {} for {} nodes",
            tree_bytes.len(),
            expected,
            tree.node_count()
        )));
    }

    metadata.node_count = tree.node_count();
    let metadata_bytes = metadata.to_bytes()?;

    let mut out = Vec::with_capacity(
        tree_bytes.len()
            + DATA_SEPARATOR.len()
            + data_section.len()
            + METADATA_MARKER.len()
            + metadata_bytes.len(),
    );
    out.extend_from_slice(&tree_bytes);
    out.extend_from_slice(&DATA_SEPARATOR);
    out.extend_from_slice(data_section);
    out.extend_from_slice(METADATA_MARKER);
    out.extend_from_slice(&metadata_bytes);

    tracing::debug!(
        node_count = metadata.node_count,
        tree_bytes = tree_bytes.len(),
        data_bytes = data_section.len(),
        total = out.len(),
        "serialized envelope"
    );

    Ok(out)
}
