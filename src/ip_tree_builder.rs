//! IP Tree Builder for MMDB Format
//!
//! Builds a binary search tree for IP address lookups following the MMDB layout.
//! Supports both IPv4 and IPv6 with CIDR prefixes.
//!
//! IPv4 networks inserted into an IPv6 tree live under `::/96`, so
//! `10.0.0.0/8` becomes `::a00:0/104`. In an IPv4 tree the 32 address bits
//! sit at the top of the 128-bit key and the tree is at most 32 levels deep.

use crate::error::{MmdbError, Result};
use crate::mmdb::tree::encode_node;
use crate::mmdb::types::{IpVersion, RecordSize, DATA_SEPARATOR_LEN};
use crate::mmdb::PrefixTree;
use std::net::IpAddr;

/// IP tree builder using arena allocation
pub struct IpTreeBuilder {
    /// Record size for the tree
    record_size: RecordSize,
    /// All nodes in the tree (arena), root at index 0
    nodes: Vec<Node>,
    /// IP version (determines tree depth)
    ip_version: IpVersion,
}

/// A node in the IP tree
#[derive(Debug, Clone)]
struct Node {
    /// Left child (bit 0)
    left: NodePointer,
    /// Right child (bit 1)
    right: NodePointer,
}

/// Node pointer - can point to another node, data, or be empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodePointer {
    /// Points to another node (value is node ID)
    Node(u32),
    /// Points to data section (data offset, prefix length)
    ///
    /// The prefix length only matters while building: a longer prefix
    /// always wins over a shorter one, whatever the insertion order.
    Data(u32, u8),
    /// Empty (not found marker)
    Empty,
}

impl IpTreeBuilder {
    /// Create a new IPv4 tree builder
    pub fn new_v4(record_size: RecordSize) -> Self {
        Self::new(IpVersion::V4, record_size)
    }

    /// Create a new IPv6 tree builder (can include IPv4)
    pub fn new_v6(record_size: RecordSize) -> Self {
        Self::new(IpVersion::V6, record_size)
    }

    /// Create a builder for `ip_version`
    pub fn new(ip_version: IpVersion, record_size: RecordSize) -> Self {
        Self {
            record_size,
            nodes: vec![Node::new_empty()],
            ip_version,
        }
    }

    /// Address family of the tree
    pub fn ip_version(&self) -> IpVersion {
        self.ip_version
    }

    /// Change the record width used when serializing
    ///
    /// Node and data records are range-checked in `to_bytes`, so narrowing
    /// after insertion is safe.
    pub fn set_record_size(&mut self, record_size: RecordSize) {
        self.record_size = record_size;
    }

    /// Reserve capacity for nodes to avoid reallocation
    pub fn reserve_nodes(&mut self, capacity: usize) {
        self.nodes
            .reserve(capacity.saturating_sub(self.nodes.len()));
    }

    /// Insert an IP address or CIDR range with associated data offset
    ///
    /// # Arguments
    /// * `addr` - IP address (v4 or v6); bits past the prefix are ignored
    /// * `prefix_len` - Network prefix length (netmask)
    /// * `data_offset` - Offset into the data section
    pub fn insert(&mut self, addr: IpAddr, prefix_len: u8, data_offset: u32) -> Result<()> {
        match addr {
            IpAddr::V4(v4) => {
                if prefix_len > 32 {
                    return Err(MmdbError::InvalidIpAddress(format!(
                        "IPv4 prefix length {} exceeds 32",
                        prefix_len
                    )));
                }
                let bits = u32::from(v4) as u128;
                match self.ip_version {
                    IpVersion::V6 => self.insert_bits(bits, 96 + prefix_len, data_offset),
                    IpVersion::V4 => self.insert_bits(bits << 96, prefix_len, data_offset),
                }
            }
            IpAddr::V6(v6) => {
                // ::ffff:a.b.c.d/n is the IPv4 network a.b.c.d/(n - 96); lookups
                // fold mapped queries the same way
                if let Some(v4) = v6.to_ipv4_mapped().filter(|_| prefix_len >= 96) {
                    if prefix_len > 128 {
                        return Err(MmdbError::InvalidIpAddress(format!(
                            "IPv6 prefix length {} exceeds 128",
                            prefix_len
                        )));
                    }
                    return self.insert(IpAddr::V4(v4), prefix_len - 96, data_offset);
                }
                if self.ip_version == IpVersion::V4 {
                    return Err(MmdbError::InvalidIpAddress(format!(
                        "Cannot insert IPv6 address {} into IPv4-only tree",
                        v6
                    )));
                }
                if prefix_len > 128 {
                    return Err(MmdbError::InvalidIpAddress(format!(
                        "IPv6 prefix length {} exceeds 128",
                        prefix_len
                    )));
                }
                self.insert_bits(u128::from(v6), prefix_len, data_offset)
            }
        }
    }

    /// Walk `prefix_len` bits of `bits` from the root and attach the data
    fn insert_bits(&mut self, bits: u128, prefix_len: u8, data_offset: u32) -> Result<()> {
        if prefix_len == 0 {
            // Default route: fill every gap in the whole tree
            self.backfill_less_specific(0, data_offset, 0);
            return Ok(());
        }

        let mut node_id = 0u32;

        for depth in 0..prefix_len {
            let bit = (bits >> (127 - depth)) & 1 == 1;
            let child = self.nodes[node_id as usize].child(bit);

            if depth + 1 == prefix_len {
                match child {
                    NodePointer::Empty => {
                        self.set_child(node_id, bit, NodePointer::Data(data_offset, prefix_len));
                    }
                    NodePointer::Data(_, existing_prefix_len) => {
                        // Equal prefixes: the later insert replaces the earlier one
                        if prefix_len >= existing_prefix_len {
                            self.set_child(
                                node_id,
                                bit,
                                NodePointer::Data(data_offset, prefix_len),
                            );
                        }
                    }
                    NodePointer::Node(child_id) => {
                        // More specific routes already live below; fill around them
                        self.backfill_less_specific(child_id, data_offset, prefix_len);
                    }
                }
                return Ok(());
            }

            node_id = match child {
                NodePointer::Empty => {
                    let new_id = self.allocate_node()?;
                    self.set_child(node_id, bit, NodePointer::Node(new_id));
                    new_id
                }
                NodePointer::Node(child_id) => child_id,
                NodePointer::Data(existing_offset, existing_prefix_len) => {
                    // A less specific prefix ends here. Split the leaf into a
                    // node whose children both keep the existing data.
                    let new_id = self.allocate_node()?;
                    let inherited = NodePointer::Data(existing_offset, existing_prefix_len);
                    self.nodes[new_id as usize] = Node {
                        left: inherited,
                        right: inherited,
                    };
                    self.set_child(node_id, bit, NodePointer::Node(new_id));
                    new_id
                }
            };
        }

        Ok(())
    }

    fn set_child(&mut self, node_id: u32, bit: bool, pointer: NodePointer) {
        let node = &mut self.nodes[node_id as usize];
        if bit {
            node.right = pointer;
        } else {
            node.left = pointer;
        }
    }

    /// Allocate a new node and return its ID
    fn allocate_node(&mut self) -> Result<u32> {
        let id = u32::try_from(self.nodes.len())
            .ok()
            .filter(|&id| id < self.record_size.max_record_value())
            .ok_or_else(|| {
                MmdbError::Build(format!(
                    "Tree exceeds {} nodes addressable by {}-bit records",
                    self.record_size.max_record_value(),
                    self.record_size.bits()
                ))
            })?;
        self.nodes.push(Node::new_empty());
        Ok(id)
    }

    /// Backfill a subtree with less-specific prefix data
    ///
    /// Empty children take the new data and longer prefixes are left alone.
    /// Data of equal length can only be the same network split earlier, so
    /// it is replaced like any shorter prefix.
    fn backfill_less_specific(&mut self, node_id: u32, data_offset: u32, prefix_len: u8) {
        for bit in [false, true] {
            match self.nodes[node_id as usize].child(bit) {
                NodePointer::Empty => {
                    self.set_child(node_id, bit, NodePointer::Data(data_offset, prefix_len));
                }
                NodePointer::Data(_, existing_prefix_len) => {
                    if prefix_len >= existing_prefix_len {
                        self.set_child(node_id, bit, NodePointer::Data(data_offset, prefix_len));
                    }
                }
                NodePointer::Node(child_id) => {
                    self.backfill_less_specific(child_id, data_offset, prefix_len);
                }
            }
        }
    }

    /// Convert node pointer to its on-disk record value
    fn pointer_to_value(&self, pointer: NodePointer, node_count: u32) -> Result<u32> {
        let value = match pointer {
            NodePointer::Empty => node_count,
            NodePointer::Node(id) => id,
            NodePointer::Data(offset, _) => node_count
                .checked_add(DATA_SEPARATOR_LEN)
                .and_then(|base| base.checked_add(offset))
                .ok_or_else(|| {
                    MmdbError::Build(format!(
                        "Data pointer overflow: node_count={} + 16 + offset={} exceeds u32::MAX",
                        node_count, offset
                    ))
                })?,
        };

        if value > self.record_size.max_record_value() {
            return Err(MmdbError::Build(format!(
                "Record value {} does not fit in {} bits; use a wider record size",
                value,
                self.record_size.bits()
            )));
        }
        Ok(value)
    }
}

impl PrefixTree for IpTreeBuilder {
    fn node_count(&self) -> u32 {
        // allocate_node keeps the arena below max_record_value
        self.nodes.len() as u32
    }

    fn record_size(&self) -> RecordSize {
        self.record_size
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let node_count = self.node_count();
        let node_size = self.record_size.node_bytes();
        let mut tree = vec![0u8; self.nodes.len() * node_size];

        for (node, out) in self.nodes.iter().zip(tree.chunks_exact_mut(node_size)) {
            let left = self.pointer_to_value(node.left, node_count)?;
            let right = self.pointer_to_value(node.right, node_count)?;
            encode_node(out, self.record_size, left, right);
        }

        Ok(tree)
    }
}

impl Node {
    fn new_empty() -> Self {
        Self {
            left: NodePointer::Empty,
            right: NodePointer::Empty,
        }
    }

    fn child(&self, bit: bool) -> NodePointer {
        if bit {
            self.right
        } else {
            self.left
        }
    }
}
