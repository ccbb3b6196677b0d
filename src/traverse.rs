/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Node and edge traversers (`spec.md` §6), usable over both tree- and
//! flat-state graphs.
//!
//! Grounded in the original library's `misc-template.c` traverser family
//! (`dglNodeTraverser`, `dglEdgesetTraverser`, `dglNodeGetOutEdgeset` /
//! `...InEdgeset`) and, for the step-by-step iteration shape, the teacher's
//! sequential visit iterators (`visits/depth_first/seq.rs`,
//! `visits/breadth_first/seq.rs`), which favor a hand-rolled `Iterator`
//! over recursion so traversal never risks a deep call stack.

use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::record::{Edge, Id};

/// Iterates every node id in a graph, in ascending id order, in either
/// tree- or flat-state.
pub struct NodeTraverser {
    ids: std::vec::IntoIter<Id>,
}

impl NodeTraverser {
    pub fn new(graph: &Graph) -> Result<Self> {
        let ids: Vec<Id> = match graph.nodes() {
            Ok(nodes) => nodes.keys().copied().collect(),
            Err(GraphError::BadOnFlatGraph) => graph.flat_node_ids()?,
            Err(e) => return Err(e),
        };
        Ok(Self {
            ids: ids.into_iter(),
        })
    }
}

impl Iterator for NodeTraverser {
    type Item = Id;
    fn next(&mut self) -> Option<Id> {
        self.ids.next()
    }
}

/// Which side of a node's incident edges an [`EdgesetTraverser`] walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgesetSide {
    Out,
    In,
}

/// Iterates the out- or in-edgeset of a single node, in edgeset order
/// (insertion order in tree-state; on-disk order in flat-state). When the
/// graph carries a cost prioritizer (`GraphOptions::EDGE_PRIORITIZE_COST`)
/// and `cost_ordered` is requested, the out-edgeset is instead walked in
/// ascending-cost order via the cost index.
pub struct EdgesetTraverser {
    edges: std::vec::IntoIter<Id>,
}

impl EdgesetTraverser {
    pub fn new(graph: &Graph, node: Id, side: EdgesetSide, cost_ordered: bool) -> Result<Self> {
        if side == EdgesetSide::In && !graph.version().has_edge_map() {
            return Err(GraphError::NotSupported);
        }
        let ids = if cost_ordered && side == EdgesetSide::Out {
            graph.out_edgeset_cost_ordered(node)?
        } else {
            graph.edgeset_ids(node, side)?
        };
        Ok(Self {
            edges: ids.into_iter(),
        })
    }
}

impl Iterator for EdgesetTraverser {
    type Item = Id;
    fn next(&mut self) -> Option<Id> {
        self.edges.next()
    }
}

/// Iterates every edge in the graph, in ascending edge-id order, or, when
/// `cost_ordered` is set, in nondecreasing cost order with ties broken by
/// id (`spec.md` §4.8, §6 edge-priority traverser). v1 has no edge map:
/// this traverser is `NotSupported` there, matching `get_edge`/`del_edge`.
pub struct EdgeTraverser {
    ids: std::vec::IntoIter<Id>,
}

impl EdgeTraverser {
    pub fn new(graph: &Graph, cost_ordered: bool) -> Result<Self> {
        if !graph.version().has_edge_map() {
            return Err(GraphError::NotSupported);
        }
        let ids: Vec<Id> = if cost_ordered {
            graph.edges_cost_ordered()?
        } else {
            match graph.edges() {
                Ok(edges) => edges.keys().copied().collect(),
                Err(GraphError::BadOnFlatGraph) => graph.flat_edge_ids()?,
                Err(e) => return Err(e),
            }
        };
        Ok(Self {
            ids: ids.into_iter(),
        })
    }
}

impl Iterator for EdgeTraverser {
    type Item = Id;
    fn next(&mut self) -> Option<Id> {
        self.ids.next()
    }
}

/// Resolves a sequence of edge ids yielded by a traverser into their full
/// [`Edge`] records. A thin convenience so callers are not forced to call
/// `graph.get_edge` in a loop themselves.
pub fn resolve_edges(graph: &Graph, ids: impl IntoIterator<Item = Id>) -> Result<Vec<Edge>> {
    ids.into_iter().map(|id| graph.get_edge(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::AddFlags;

    #[test]
    fn node_traverser_yields_ascending_ids() {
        let mut g = Graph::new();
        for id in [5, 1, 3] {
            g.add_node(id, &[], AddFlags::empty()).unwrap();
        }
        let ids: Vec<Id> = NodeTraverser::new(&g).unwrap().collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn edgeset_traverser_walks_out_then_in() {
        let mut g = Graph::new();
        g.add_edge(1, 10, 20, 1, AddFlags::empty()).unwrap();
        g.add_edge(2, 10, 30, 1, AddFlags::empty()).unwrap();
        let out: Vec<Id> = EdgesetTraverser::new(&g, 10, EdgesetSide::Out, false)
            .unwrap()
            .collect();
        assert_eq!(out, vec![1, 2]);
        let in_: Vec<Id> = EdgesetTraverser::new(&g, 20, EdgesetSide::In, false)
            .unwrap()
            .collect();
        assert_eq!(in_, vec![1]);
    }

    #[test]
    fn edge_traverser_not_supported_on_v1() {
        let g = crate::graph::GraphBuilder::new()
            .version(crate::flags::GraphVersion::V1)
            .build();
        assert_eq!(
            EdgeTraverser::new(&g, false).err(),
            Some(GraphError::NotSupported)
        );
    }

    #[test]
    fn edge_traverser_cost_ordered_yields_nondecreasing_cost() {
        let mut g = crate::graph::GraphBuilder::new()
            .options(crate::flags::GraphOptions::EDGE_PRIORITIZE_COST)
            .build();
        g.add_edge(1, 10, 20, 30, AddFlags::empty()).unwrap();
        g.add_edge(2, 10, 20, 10, AddFlags::empty()).unwrap();
        g.add_edge(3, 10, 20, 20, AddFlags::empty()).unwrap();

        let ids: Vec<Id> = EdgeTraverser::new(&g, true).unwrap().collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
