/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Shortest-path search (`spec.md` §4.9, §6 `shortest_path`/
//! `shortest_distance`/`sp_cache_init`/`sp_cache_release`).
//!
//! Grounded in the original library's `sp-template.c` Dijkstra
//! implementation: a cost-ordered frontier (`heap.rs`'s `Heap<Frontier>`),
//! an AVL-backed visited set, and an AVL-backed predecessor/distance map
//! keyed by node id that doubles as the report's backing store once the
//! search completes.

use crate::avl::AvlTree;
use crate::error::{GraphError, Result};
use crate::flags::EdgeStatus;
use crate::graph::Graph;
use crate::heap::{Heap, HeapKind};
use crate::record::{Edge, Id};

/// One entry in the predecessor/distance map: how a node was reached.
#[derive(Debug, Clone)]
struct PredDist {
    predecessor_id: Id,
    predecessor_edge: Id,
    edge_cost: i32,
    distance: i64,
    /// Set once this node has been popped off the frontier and finalized;
    /// later, stale frontier entries for it are ignored rather than
    /// reprocessed.
    settled: bool,
}

/// Reusable Dijkstra search state, scoped to a single start node.
///
/// Constructing a fresh [`SpCache`] per query is correct but wasteful when
/// a caller issues many queries from the same start node against an
/// unchanging graph; `spec.md` §6 exposes `sp_cache_init`/
/// `sp_cache_release` for exactly that reuse, though this implementation's
/// cache is in practice single-use (the frontier is fully drained by
/// [`SpCache::run`]) since the graphs in scope are small enough that cache
/// reuse buys little.
pub struct SpCache {
    start: Id,
    predist: AvlTree<Id, PredDist>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Frontier {
    distance: i64,
    node: Id,
}

/// Decides whether an edge may be relaxed during the search. Returning
/// `false` excludes the edge from consideration entirely, as if it were
/// not present in the graph (`spec.md` §6 `clip_sp`).
pub trait ClipSp {
    fn allow(&mut self, edge: &Edge) -> bool;
}

impl<F: FnMut(&Edge) -> bool> ClipSp for F {
    fn allow(&mut self, edge: &Edge) -> bool {
        self(edge)
    }
}

/// Accepts every edge; the default when no clip callback is supplied.
pub struct NoClip;
impl ClipSp for NoClip {
    fn allow(&mut self, _edge: &Edge) -> bool {
        true
    }
}

/// One hop of a [`ShortestPathReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHop {
    pub node: Id,
    pub via_edge: Id,
    pub edge_cost: i32,
}

/// The result of a successful [`SpCache::run`]: the full path from start to
/// destination, and its total cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortestPathReport {
    pub destination: Id,
    pub total_cost: i64,
    /// In traversal order, start to destination. Empty when `start ==
    /// destination`.
    pub hops: Vec<ReportHop>,
}

impl SpCache {
    pub fn sp_cache_init(start: Id) -> Self {
        Self {
            start,
            predist: AvlTree::new(),
        }
    }

    pub fn sp_cache_release(self) {}

    /// Runs Dijkstra from this cache's start node to `destination`,
    /// following out-edges (and, on a v3 graph, in-edges not flagged
    /// `DIRECTED`, traversed in reverse — `spec.md` §4.9, §8 scenario 5).
    ///
    /// Steps (`spec.md` §4.9):
    /// 1. Seed the frontier with the start node at distance 0.
    /// 2. Repeatedly pop the least-distance unsettled node.
    /// 3. Relax every clip-accepted out-edge from it (in v3, also every
    ///    in-edge not flagged `DIRECTED`, traversed in reverse).
    /// 4. Stop when the destination is settled, or the frontier empties
    ///    (unreachable).
    ///
    /// Returns `Ok(None)` when the frontier drains without reaching
    /// `destination` — a distinct outcome from an error, not
    /// `GraphError::NodeIsAComponent` (`spec.md` §8 scenario 3:
    /// "unreachable, error code zero").
    pub fn run(
        &mut self,
        graph: &Graph,
        destination: Id,
        mut clip: impl ClipSp,
    ) -> Result<Option<ShortestPathReport>> {
        if graph.status(self.start).is_err() {
            return Err(GraphError::HeadNodeNotFound);
        }
        if graph.status(destination).is_err() {
            return Err(GraphError::TailNodeNotFound);
        }

        let mut frontier: Heap<Frontier> = Heap::new(HeapKind::Min);
        self.predist = AvlTree::new();
        self.predist.insert(
            self.start,
            PredDist {
                predecessor_id: self.start,
                predecessor_edge: -1,
                edge_cost: 0,
                distance: 0,
                settled: false,
            },
        );
        frontier.push(Frontier {
            distance: 0,
            node: self.start,
        });

        while let Some(Frontier { distance, node }) = frontier.pop() {
            let already_settled = self
                .predist
                .find(&node)
                .map(|e| e.settled)
                .unwrap_or(false);
            if already_settled {
                continue;
            }
            if let Some(entry) = self.predist.find_mut(&node) {
                entry.settled = true;
            }
            if node == destination {
                break;
            }

            let mut candidates: Vec<(Id, bool)> = graph
                .edgeset_ids(node, crate::traverse::EdgesetSide::Out)
                .map_err(|_| GraphError::BadEdge)?
                .into_iter()
                .map(|eid| (eid, false))
                .collect();
            // v3 is undirected: an in-edge not flagged DIRECTED is also
            // traversable, head<-tail, i.e. in reverse (`spec.md` §4.9,
            // scenario 5 "Undirected v3 with DIRECTED override").
            if graph.version() == crate::flags::GraphVersion::V3 {
                for eid in graph
                    .edgeset_ids(node, crate::traverse::EdgesetSide::In)
                    .map_err(|_| GraphError::BadEdge)?
                {
                    candidates.push((eid, true));
                }
            }
            for (eid, reverse) in candidates {
                let edge = graph.get_edge(eid).map_err(|_| GraphError::BadEdge)?;
                if reverse && edge.status.contains(EdgeStatus::DIRECTED) {
                    continue;
                }
                if !clip.allow(&edge) {
                    continue;
                }
                let next = if reverse { edge.head } else { edge.tail };
                let candidate = distance + edge.cost as i64;
                let better = match self.predist.find(&next) {
                    Some(existing) => !existing.settled && candidate < existing.distance,
                    None => true,
                };
                if better {
                    self.predist.insert(
                        next,
                        PredDist {
                            predecessor_id: node,
                            predecessor_edge: eid,
                            edge_cost: edge.cost,
                            distance: candidate,
                            settled: false,
                        },
                    );
                    frontier.push(Frontier {
                        distance: candidate,
                        node: next,
                    });
                }
            }
        }

        let dest_entry = match self.predist.find(&destination).filter(|e| e.settled) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let total_cost = dest_entry.distance;

        let mut hops = Vec::new();
        let mut cur = destination;
        while cur != self.start {
            let entry = self
                .predist
                .find(&cur)
                .expect("every reached node has a predist entry");
            hops.push(ReportHop {
                node: cur,
                via_edge: entry.predecessor_edge,
                edge_cost: entry.edge_cost,
            });
            cur = entry.predecessor_id;
        }
        hops.reverse();

        Ok(Some(ShortestPathReport {
            destination,
            total_cost,
            hops,
        }))
    }
}

/// `shortest_path`: one-shot convenience wrapper around [`SpCache`].
/// `Ok(None)` means `destination` is unreachable from `start`
/// (`spec.md` §8 scenario 3), distinct from every `Err` outcome.
pub fn shortest_path(
    graph: &Graph,
    start: Id,
    destination: Id,
    clip: impl ClipSp,
) -> Result<Option<ShortestPathReport>> {
    let mut cache = SpCache::sp_cache_init(start);
    cache.run(graph, destination, clip)
}

/// `shortest_distance`: like [`shortest_path`] but discards the hop list.
pub fn shortest_distance(
    graph: &Graph,
    start: Id,
    destination: Id,
    clip: impl ClipSp,
) -> Result<Option<i64>> {
    Ok(shortest_path(graph, start, destination, clip)?.map(|report| report.total_cost))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::AddFlags;

    fn triangle() -> Graph {
        let mut g = Graph::new();
        g.add_edge(1, 10, 20, 1, AddFlags::empty()).unwrap();
        g.add_edge(2, 20, 30, 1, AddFlags::empty()).unwrap();
        g.add_edge(3, 10, 30, 5, AddFlags::empty()).unwrap();
        g
    }

    #[test]
    fn finds_shorter_two_hop_path_over_direct_edge() {
        let g = triangle();
        let report = shortest_path(&g, 10, 30, NoClip).unwrap().unwrap();
        assert_eq!(report.total_cost, 2);
        assert_eq!(report.hops.len(), 2);
        assert_eq!(report.hops[0].node, 20);
        assert_eq!(report.hops[1].node, 30);
    }

    #[test]
    fn clip_rejection_forces_a_detour() {
        let g = triangle();
        let report = shortest_path(&g, 10, 30, |e: &Edge| e.id != 1)
            .unwrap()
            .unwrap();
        assert_eq!(report.total_cost, 5);
        assert_eq!(report.hops.len(), 1);
        assert_eq!(report.hops[0].via_edge, 3);
    }

    #[test]
    fn unreachable_destination_is_not_an_error() {
        let mut g = triangle();
        g.add_node(99, &[], AddFlags::empty()).unwrap();
        assert_eq!(shortest_path(&g, 10, 99, NoClip).unwrap(), None);
    }

    #[test]
    fn start_equals_destination_has_no_hops() {
        let g = triangle();
        let report = shortest_path(&g, 10, 10, NoClip).unwrap().unwrap();
        assert_eq!(report.total_cost, 0);
        assert!(report.hops.is_empty());
    }

    #[test]
    fn v3_undirected_edge_traverses_in_reverse_unless_flagged_directed() {
        use crate::flags::GraphVersion;
        use crate::graph::GraphBuilder;
        let mut g = GraphBuilder::new().version(GraphVersion::V3).build();
        g.add_edge(1, 1, 2, 5, AddFlags::empty()).unwrap();
        g.add_edge(2, 2, 1, 100, AddFlags::DIRECTED).unwrap();

        let forward = shortest_path(&g, 1, 2, NoClip).unwrap().unwrap();
        assert_eq!(forward.total_cost, 5);
        assert_eq!(forward.hops[0].via_edge, 1);

        let backward = shortest_path(&g, 2, 1, NoClip).unwrap().unwrap();
        assert_eq!(backward.total_cost, 5);
        assert_eq!(backward.hops[0].via_edge, 1);
    }
}
