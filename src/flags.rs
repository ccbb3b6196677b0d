/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Bitset types carried verbatim across mutate / flatten / serialize.
//!
//! Layout and numeric values follow the original library's `DGL_NS_*`,
//! `DGL_ES_*`, `DGL_GO_*` and `DGL_GF_*` constants so that the on-disk
//! image in `SPEC_FULL.md` §6 is bit-exact.

use bitflags::bitflags;

bitflags! {
    /// A node's status: whether it has outgoing edges, incoming edges, or
    /// neither.
    ///
    /// Exactly one of `ALONE` or a non-empty subset of `{HEAD, TAIL}` is
    /// ever set (`SPEC_FULL.md` §3, Invariants).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct NodeStatus: u32 {
        /// The node is the head (origin) of at least one edge.
        const HEAD  = 0x1;
        /// The node is the tail (destination) of at least one edge (v2/v3).
        const TAIL  = 0x2;
        /// The node has no incident edges in either direction.
        const ALONE = 0x4;
    }
}

bitflags! {
    /// Per-edge status. Only `DIRECTED` is defined; it forces an edge to
    /// behave as directed even inside an otherwise undirected (v3) graph.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct EdgeStatus: u32 {
        const DIRECTED = 0x1;
    }
}

bitflags! {
    /// Graph-wide behavioral options, stored in the context and the
    /// on-disk header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct GraphOptions: u32 {
        /// Maintain the cost-keyed edge prioritizer described in
        /// `SPEC_FULL.md` §4.4.
        const EDGE_PRIORITIZE_COST = 0x10;
        /// Reserved: no code path in the original consumed this.
        const EDGE_PRIORITIZE_ATTR = 0x20;
        /// Reserved (`SPEC_FULL.md` §9 Open Questions): accepted, never
        /// acted upon.
        const NODE_PRIORITIZE_ATTR = 0x40;
    }
}

bitflags! {
    /// Caller-set classification tags, preserved verbatim across
    /// flatten/serialize but never computed or validated by the core.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct GraphFamily: u32 {
        const COMPLETE  = 0x1;
        const BIPARTITE = 0x2;
        const REGULAR   = 0x4;
        const BOUQUET   = 0x8;
        const DIPOLE    = 0x10;
        const PATH      = 0x20;
        const CYCLE     = 0x40;
    }
}

bitflags! {
    /// Flags accepted by [`Graph::add_edge`](crate::graph::Graph::add_edge)
    /// and [`Graph::add_node`](crate::graph::Graph::add_node).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct AddFlags: u32 {
        /// Also add the reverse edge with the complementary attributes.
        const STRONG_CONNECT = 0x1;
        /// Reserved: no consuming code path in the original library.
        const ALONE = 0x2;
        /// Reserved: no consuming code path in the original library.
        const MERGE_EDGE = 0x4;
        /// Forces the new edge's status to `EdgeStatus::DIRECTED` even on a
        /// v3 (undirected) graph — the "one-way street" override
        /// (`spec.md` §8, scenario 5). The original library overloads this
        /// onto the same bit as `STRONG_CONNECT` in its `nFlags` word;
        /// kept as a distinct bit here so a caller can request both
        /// independently.
        const DIRECTED = 0x8;
    }
}

/// The graph's version, fixing its edgeset/edge-map layout and whether it
/// is directed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum GraphVersion {
    /// Directed; no in-edgeset, no edge map, no per-edge deletion.
    V1 = 1,
    /// Directed; in- and out-edgesets, edge map, per-edge deletion.
    V2 = 2,
    /// Undirected by default; identical layout to v2; edges flagged
    /// `DIRECTED` are treated as directed even here.
    V3 = 3,
}

impl GraphVersion {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(GraphVersion::V1),
            2 => Some(GraphVersion::V2),
            3 => Some(GraphVersion::V3),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Whether this version maintains a separate edge map and in-edgesets.
    pub fn has_edge_map(self) -> bool {
        !matches!(self, GraphVersion::V1)
    }
}

/// Host/file byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Endianness {
    Big = 1,
    Little = 2,
}

impl Endianness {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Endianness::Big),
            2 => Some(Endianness::Little),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// The running host's native byte order.
    pub fn host() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }
}
