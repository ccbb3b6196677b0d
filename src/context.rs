/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The graph context: counters, versioning, endianness, and the opaque
//! settings block carried verbatim across flatten/serialize
//! (`SPEC_FULL.md` §3 "Graph context").

use crate::flags::{Endianness, GraphFamily, GraphOptions, GraphVersion};

/// Number of 4-byte words in the caller-reserved opaque block
/// (`spec.md` §6, header offset 10, 64 bytes).
pub const OPAQUE_WORDS: usize = 16;

/// Rounds `n` up to the next multiple of 4, per `spec.md` §4.4
/// ("rounds attribute sizes up to a 4-byte multiple").
pub fn round_up4(n: u32) -> u32 {
    (n + 3) & !3
}

/// Everything about a graph that is not the node/edge storage itself:
/// counters, version/endianness tags, the options and family bitsets, and
/// the caller-opaque settings block. Round-tripped verbatim through
/// flatten/unflatten and the on-disk header.
#[derive(Debug, Clone)]
pub struct GraphContext {
    pub version: GraphVersion,
    pub endianness: Endianness,
    pub node_attr_size: u32,
    pub edge_attr_size: u32,
    pub opaque: [u32; OPAQUE_WORDS],
    pub options: GraphOptions,
    pub family: GraphFamily,
    pub accumulated_cost: i64,
    pub node_count: u32,
    pub head_count: u32,
    pub tail_count: u32,
    pub alone_count: u32,
    pub edge_count: u32,
}

impl GraphContext {
    pub fn new(
        version: GraphVersion,
        node_attr_size: u32,
        edge_attr_size: u32,
        opaque: [u32; OPAQUE_WORDS],
    ) -> Self {
        Self {
            version,
            endianness: Endianness::host(),
            node_attr_size: round_up4(node_attr_size),
            edge_attr_size: round_up4(edge_attr_size),
            opaque,
            options: GraphOptions::empty(),
            family: GraphFamily::empty(),
            accumulated_cost: 0,
            node_count: 0,
            head_count: 0,
            tail_count: 0,
            alone_count: 0,
            edge_count: 0,
        }
    }

    /// `node_count == head_count + tail_count - both_count + alone_count`,
    /// the universal invariant from `spec.md` §8. Exposed so tests and the
    /// unflatten recovery path can assert it directly.
    pub fn both_count(&self, both: u32) -> bool {
        self.node_count == self.head_count + self.tail_count - both + self.alone_count
    }
}
