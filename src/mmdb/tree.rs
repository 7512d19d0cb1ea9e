//! MMDB Search Tree Traversal
//!
//! Implements binary search tree traversal for IP address lookups.
//! The tree uses a compact binary representation where each node contains
//! two records (left and right) that point to either:
//! - Another node (continue traversal)
//! - A data section offset (found)
//! - A "not found" marker
//!
//! Lookups always consume a 16-byte address, most significant bit first.
//! Callers holding a 4-byte address expand it before calling in; see
//! `Database::lookup_ip` for the rules.

use super::metadata::Metadata;
use super::types::{RecordSize, DATA_SEPARATOR_LEN};
use crate::error::{MmdbError, Result};

/// Number of address bits walked per lookup
pub const ADDRESS_BITS: usize = 128;

/// Result of an IP lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupResult {
    /// Offset into the data section (relative to data section start)
    pub data_offset: u32,
    /// Number of address bits consumed before reaching the leaf
    pub prefix_len: u8,
}

/// Search tree for IP address lookups
pub struct SearchTree<'a> {
    /// The tree region
    tree: &'a [u8],
    /// Length of the data region, for leaf validation
    data_len: usize,
    node_count: u32,
    record_size: RecordSize,
}

impl<'a> SearchTree<'a> {
    /// Create a search tree over a tree region
    pub fn new(tree: &'a [u8], data_len: usize, metadata: &Metadata) -> Self {
        Self {
            tree,
            data_len,
            node_count: metadata.node_count,
            record_size: metadata.record_size,
        }
    }

    /// Width of one node in bytes
    pub fn node_byte_width(&self) -> usize {
        self.record_size.node_bytes()
    }

    /// Walk the tree for a 16-byte address
    ///
    /// Returns `Ok(None)` when the address has no covering prefix.
    pub fn lookup(&self, address: &[u8; 16]) -> Result<Option<LookupResult>> {
        let mut node = 0u32;
        let mut depth = 0usize;

        while depth < ADDRESS_BITS && node < self.node_count {
            let (left, right) = self.read_node(node)?;
            node = if bit_at(address, depth) { right } else { left };
            depth += 1;
        }

        if node == self.node_count {
            tracing::trace!(depth, "no match");
            return Ok(None);
        }
        if node < self.node_count {
            // Ran out of address bits while still on an internal node
            return Ok(None);
        }

        let data_offset = self.resolve_leaf(node)?;
        tracing::trace!(depth, data_offset, "leaf reached");
        Ok(Some(LookupResult {
            data_offset,
            prefix_len: depth as u8,
        }))
    }

    /// Read both child references of `node`
    pub fn read_node(&self, node: u32) -> Result<(u32, u32)> {
        let width = self.node_byte_width();
        let start = node as usize * width;
        let bytes = self.tree.get(start..start + width).ok_or_else(|| {
            MmdbError::TraversalOutOfRange(format!(
                "Node {} at byte {} lies outside tree region of {} bytes",
                node,
                start,
                self.tree.len()
            ))
        })?;
        Ok(decode_node(bytes, self.record_size))
    }

    /// Turn a leaf record into a data-region offset
    ///
    /// Leaf records are `node_count + 16 + offset`.
    fn resolve_leaf(&self, record: u32) -> Result<u32> {
        let offset = record
            .checked_sub(self.node_count)
            .and_then(|v| v.checked_sub(DATA_SEPARATOR_LEN))
            .ok_or_else(|| {
                MmdbError::TraversalOutOfRange(format!(
                    "Leaf record {} is below data start (node_count = {})",
                    record, self.node_count
                ))
            })?;

        if offset as usize >= self.data_len {
            return Err(MmdbError::TraversalOutOfRange(format!(
                "Leaf record {} points at data offset {} beyond data region of {} bytes",
                record, offset, self.data_len
            )));
        }

        Ok(offset)
    }
}

/// Split one node into its (left, right) records
pub fn decode_node(bytes: &[u8], record_size: RecordSize) -> (u32, u32) {
    match record_size {
        RecordSize::Bits24 => (be_u32(&bytes[0..3]), be_u32(&bytes[3..6])),
        RecordSize::Bits28 => {
            // Middle byte: left's high nibble above right's high nibble
            let left = ((bytes[3] as u32 & 0xF0) << 20) | be_u32(&bytes[0..3]);
            let right = ((bytes[3] as u32 & 0x0F) << 24) | be_u32(&bytes[4..7]);
            (left, right)
        }
        RecordSize::Bits32 => (be_u32(&bytes[0..4]), be_u32(&bytes[4..8])),
    }
}

/// Pack two records into `out`, which must be one node wide
pub fn encode_node(out: &mut [u8], record_size: RecordSize, left: u32, right: u32) {
    match record_size {
        RecordSize::Bits24 => {
            out[0..3].copy_from_slice(&left.to_be_bytes()[1..]);
            out[3..6].copy_from_slice(&right.to_be_bytes()[1..]);
        }
        RecordSize::Bits28 => {
            out[0..3].copy_from_slice(&left.to_be_bytes()[1..]);
            out[3] = (((left >> 24) & 0x0F) << 4) as u8 | ((right >> 24) & 0x0F) as u8;
            out[4..7].copy_from_slice(&right.to_be_bytes()[1..]);
        }
        RecordSize::Bits32 => {
            out[0..4].copy_from_slice(&left.to_be_bytes());
            out[4..8].copy_from_slice(&right.to_be_bytes());
        }
    }
}

fn be_u32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

/// Bit `index` of the address, most significant first
#[inline]
fn bit_at(address: &[u8; 16], index: usize) -> bool {
    (address[index / 8] >> (7 - index % 8)) & 1 == 1
}
