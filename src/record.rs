/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Node, edge, and edgeset records (`SPEC_FULL.md` §4.3).
//!
//! The tree-state engine keeps one canonical, richest (v3-like) in-memory
//! shape regardless of declared version, per the "Three format versions"
//! design note in `spec.md` §9: v1's "edges live inline in the
//! out-edgeset, no edge map, no in-edgeset" layout is reproduced only at
//! the I/O boundary (`io.rs`, `flatten.rs`); the mutation API still gates
//! version-specific operations (`del_edge`, `del_node`, in-degree) the way
//! `spec.md` §4.4/§4.9 requires.

use crate::flags::{EdgeStatus, NodeStatus};

/// A node or edge identifier: caller-chosen, unique within its kind.
pub type Id = i32;

/// A node record.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: Id,
    pub status: NodeStatus,
    pub attr: Vec<u8>,
    /// Edges whose head is this node.
    pub out_edges: Vec<Id>,
    /// Edges whose tail is this node. Always empty for a v1 graph.
    pub in_edges: Vec<Id>,
}

impl Node {
    /// A node created via an explicit `add_node` call: starts `ALONE`.
    pub(crate) fn new(id: Id, attr: Vec<u8>) -> Self {
        Node {
            id,
            status: NodeStatus::ALONE,
            attr,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        }
    }

    /// A node materialized implicitly as an `add_edge` endpoint that did
    /// not already exist. Starts with an empty status, not `ALONE`: the
    /// original library's edge-management code only clears `ALONE` on
    /// nodes that already carried it, and a brand-new node is never given
    /// it in the first place, so `alone_count` must not be decremented for
    /// these (`DESIGN.md`, "implicit node creation").
    pub(crate) fn new_implicit(id: Id, attr: Vec<u8>) -> Self {
        Node {
            id,
            status: NodeStatus::empty(),
            attr,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        }
    }

    pub fn is_alone(&self) -> bool {
        self.out_edges.is_empty() && self.in_edges.is_empty()
    }

    /// Recomputes `status` from the current edgeset contents.
    pub(crate) fn refresh_status(&mut self) {
        self.status = if self.is_alone() {
            NodeStatus::ALONE
        } else {
            let mut s = NodeStatus::empty();
            if !self.out_edges.is_empty() {
                s |= NodeStatus::HEAD;
            }
            if !self.in_edges.is_empty() {
                s |= NodeStatus::TAIL;
            }
            s
        };
    }
}

/// An edge record.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: Id,
    pub status: EdgeStatus,
    pub cost: i32,
    pub head: Id,
    pub tail: Id,
    pub attr: Vec<u8>,
}

impl Edge {
    /// Whether this edge is directed even inside a v3 (undirected-by-default)
    /// graph.
    pub fn is_directed(&self) -> bool {
        self.status.contains(EdgeStatus::DIRECTED)
    }
}
