/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The `Graph` type: construction, mutation, and query operations
//! (`SPEC_FULL.md` §3, §4.3, §4.4).

use log::{debug, trace, warn};

use crate::avl::AvlTree;
use crate::context::{GraphContext, OPAQUE_WORDS};
use crate::error::{GraphError, Result};
use crate::flags::{AddFlags, EdgeStatus, GraphFamily, GraphOptions, GraphVersion, NodeStatus};
use crate::flatten;
use crate::record::{Edge, Id, Node};

/// The two physical shapes a [`Graph`] can be in. Tree-state supports
/// arbitrary mutation; flat-state is the compact byte-buffer form produced
/// by [`Graph::flatten`] and required by [`Graph::write_full`].
enum GraphState {
    Tree {
        nodes: AvlTree<Id, Node>,
        edges: AvlTree<Id, Edge>,
        /// Present only when `GraphOptions::EDGE_PRIORITIZE_COST` is set:
        /// orders edge ids by `(cost, id)` for cost-ordered traversal.
        cost_index: Option<AvlTree<(i32, Id), ()>>,
    },
    Flat {
        node_bytes: Vec<u8>,
        edge_bytes: Vec<u8>,
    },
}

/// A directed or undirected graph, carrying node/edge attributes and a
/// caller-chosen opaque settings block (`SPEC_FULL.md` §3).
///
/// Maintains one canonical, richest (v3-like) in-memory shape in
/// tree-state regardless of declared version (`spec.md` §9); version gates
/// behavior at the mutation-API and I/O boundaries instead.
pub struct Graph {
    pub(crate) ctx: GraphContext,
    state: GraphState,
}

/// Builds a [`Graph`] with a non-default version, attribute sizes, options,
/// family tag, or opaque block, mirroring the original library's
/// `dglInitialize` argument list (`SPEC_FULL.md` §2 "Configuration").
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    version: GraphVersion,
    node_attr_size: u32,
    edge_attr_size: u32,
    opaque: [u32; OPAQUE_WORDS],
    options: GraphOptions,
    family: GraphFamily,
    endianness: Option<crate::flags::Endianness>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            version: GraphVersion::V2,
            node_attr_size: 0,
            edge_attr_size: 0,
            opaque: [0; OPAQUE_WORDS],
            options: GraphOptions::empty(),
            family: GraphFamily::empty(),
            endianness: None,
        }
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: GraphVersion) -> Self {
        self.version = version;
        self
    }

    pub fn node_attr_size(mut self, bytes: u32) -> Self {
        self.node_attr_size = bytes;
        self
    }

    pub fn edge_attr_size(mut self, bytes: u32) -> Self {
        self.edge_attr_size = bytes;
        self
    }

    pub fn opaque(mut self, opaque: [u32; OPAQUE_WORDS]) -> Self {
        self.opaque = opaque;
        self
    }

    pub fn options(mut self, options: GraphOptions) -> Self {
        self.options = options;
        self
    }

    pub fn family(mut self, family: GraphFamily) -> Self {
        self.family = family;
        self
    }

    /// Overrides the byte order tagged onto this graph's flat image.
    /// Defaults to the host's native order; set explicitly to produce an
    /// image for, or simulate ingesting one from, a foreign-endian host
    /// (`spec.md` §8, the cross-endianness round-trip law).
    pub fn endianness(mut self, endianness: crate::flags::Endianness) -> Self {
        self.endianness = Some(endianness);
        self
    }

    pub fn build(self) -> Graph {
        let mut ctx = GraphContext::new(
            self.version,
            self.node_attr_size,
            self.edge_attr_size,
            self.opaque,
        );
        ctx.options = self.options;
        ctx.family = self.family;
        if let Some(endianness) = self.endianness {
            ctx.endianness = endianness;
        }
        let cost_index = self
            .options
            .contains(GraphOptions::EDGE_PRIORITIZE_COST)
            .then(AvlTree::new);
        debug!(
            "initialize: version={:?} node_attr_size={} edge_attr_size={} options={:?}",
            ctx.version, ctx.node_attr_size, ctx.edge_attr_size, ctx.options
        );
        Graph {
            ctx,
            state: GraphState::Tree {
                nodes: AvlTree::new(),
                edges: AvlTree::new(),
                cost_index,
            },
        }
    }
}

impl Graph {
    /// A v2 graph with no attributes and default options.
    pub fn new() -> Self {
        GraphBuilder::new().build()
    }

    pub fn builder() -> GraphBuilder {
        GraphBuilder::new()
    }

    pub fn version(&self) -> GraphVersion {
        self.ctx.version
    }

    pub fn is_flat(&self) -> bool {
        matches!(self.state, GraphState::Flat { .. })
    }

    pub fn node_count(&self) -> u32 {
        self.ctx.node_count
    }

    pub fn edge_count(&self) -> u32 {
        self.ctx.edge_count
    }

    pub fn accumulated_cost(&self) -> i64 {
        self.ctx.accumulated_cost
    }

    fn tree(&self) -> Result<(&AvlTree<Id, Node>, &AvlTree<Id, Edge>)> {
        match &self.state {
            GraphState::Tree { nodes, edges, .. } => Ok((nodes, edges)),
            GraphState::Flat { .. } => Err(GraphError::BadOnFlatGraph),
        }
    }

    fn tree_mut(
        &mut self,
    ) -> Result<(
        &mut AvlTree<Id, Node>,
        &mut AvlTree<Id, Edge>,
        &mut Option<AvlTree<(i32, Id), ()>>,
    )> {
        match &mut self.state {
            GraphState::Tree {
                nodes,
                edges,
                cost_index,
            } => Ok((nodes, edges, cost_index)),
            GraphState::Flat { .. } => Err(GraphError::BadOnFlatGraph),
        }
    }

    // -- node/edge CRUD ---------------------------------------------------

    /// Adds an isolated node with id `id` and attribute bytes `attr`.
    ///
    /// `attr.len()` must equal the graph's configured `node_attr_size`.
    pub fn add_node(&mut self, id: Id, attr: &[u8], _flags: AddFlags) -> Result<()> {
        if attr.len() != self.ctx.node_attr_size as usize {
            return Err(GraphError::BadArgument);
        }
        let (nodes, _, _) = self.tree_mut()?;
        if nodes.contains(&id) {
            return Err(GraphError::NodeAlreadyExist);
        }
        nodes.insert(id, Node::new(id, attr.to_vec()));
        self.ctx.node_count += 1;
        self.ctx.alone_count += 1;
        trace!("add_node: id={id}");
        Ok(())
    }

    /// Removes node `id` and every edge incident on it.
    ///
    /// Unsupported on v1 graphs (`spec.md` §6: v1 has no per-node or
    /// per-edge deletion).
    pub fn del_node(&mut self, id: Id) -> Result<()> {
        if !self.ctx.version.has_edge_map() {
            return Err(GraphError::NotSupported);
        }
        let (incident, was_alone) = {
            let (nodes, _, _) = self.tree_mut()?;
            let node = nodes.find(&id).ok_or(GraphError::NodeNotFound)?;
            let incident: Vec<Id> = node
                .out_edges
                .iter()
                .chain(node.in_edges.iter())
                .copied()
                .collect();
            (incident, node.status.contains(NodeStatus::ALONE))
        };
        for eid in incident {
            // A self-loop appears in both out_edges and in_edges; skip the
            // second deletion attempt rather than erroring on it.
            if self.get_edge(eid).is_ok() {
                self.del_edge(eid)?;
            }
        }
        let (nodes, _, _) = self.tree_mut()?;
        nodes.delete(&id);
        self.ctx.node_count -= 1;
        if was_alone {
            self.ctx.alone_count -= 1;
        }
        trace!("del_node: id={id}");
        Ok(())
    }

    pub fn get_node(&self, id: Id) -> Result<&Node> {
        match &self.state {
            GraphState::Tree { nodes, .. } => nodes.find(&id).ok_or(GraphError::NodeNotFound),
            GraphState::Flat { .. } => Err(GraphError::BadOnFlatGraph),
        }
    }

    /// Reads a node's status, id, and attribute pointer from either state.
    pub fn status(&self, id: Id) -> Result<NodeStatus> {
        match &self.state {
            GraphState::Tree { nodes, .. } => {
                Ok(nodes.find(&id).ok_or(GraphError::NodeNotFound)?.status)
            }
            GraphState::Flat { node_bytes, .. } => {
                let stride = flatten::node_stride_words(self.ctx.node_attr_size) * 4;
                let off = flatten::find_node_offset(node_bytes, stride, id, self.ctx.endianness)
                    .ok_or(GraphError::NodeNotFound)?;
                let bits = crate::io::get_u32(node_bytes, off + 4, self.ctx.endianness);
                Ok(NodeStatus::from_bits_truncate(bits))
            }
        }
    }

    pub fn node_attr_get(&self, id: Id) -> Result<&[u8]> {
        match &self.state {
            GraphState::Tree { nodes, .. } => {
                Ok(&nodes.find(&id).ok_or(GraphError::NodeNotFound)?.attr)
            }
            GraphState::Flat { node_bytes, .. } => {
                let stride = flatten::node_stride_words(self.ctx.node_attr_size) * 4;
                let off = flatten::find_node_offset(node_bytes, stride, id, self.ctx.endianness)
                    .ok_or(GraphError::NodeNotFound)?;
                let attr_bytes = self.ctx.node_attr_size as usize;
                Ok(&node_bytes[off + 12..off + 12 + attr_bytes])
            }
        }
    }

    pub fn node_attr_set(&mut self, id: Id, attr: &[u8]) -> Result<()> {
        if attr.len() != self.ctx.node_attr_size as usize {
            return Err(GraphError::BadArgument);
        }
        match &mut self.state {
            GraphState::Tree { nodes, .. } => {
                let node = nodes.find_mut(&id).ok_or(GraphError::NodeNotFound)?;
                node.attr.copy_from_slice(attr);
                Ok(())
            }
            GraphState::Flat { node_bytes, .. } => {
                let stride = flatten::node_stride_words(self.ctx.node_attr_size) * 4;
                let off = flatten::find_node_offset(node_bytes, stride, id, self.ctx.endianness)
                    .ok_or(GraphError::NodeNotFound)?;
                let attr_bytes = self.ctx.node_attr_size as usize;
                node_bytes[off + 12..off + 12 + attr_bytes].copy_from_slice(attr);
                Ok(())
            }
        }
    }

    /// Updates a node's status bits and the three node-status counters,
    /// reading the node's *current* status before mutating its edgesets so
    /// a self-loop (head == tail) is handled correctly: the second touch
    /// observes the first touch's already-updated status.
    fn touch_out_edge(nodes: &mut AvlTree<Id, Node>, ctx: &mut GraphContext, head: Id, eid: Id) {
        let node = nodes.find_mut(&head).expect("head node must exist");
        let was_alone = node.status.contains(NodeStatus::ALONE);
        let was_head = node.status.contains(NodeStatus::HEAD);
        node.out_edges.push(eid);
        node.refresh_status();
        if was_alone {
            ctx.alone_count -= 1;
        }
        if !was_head {
            ctx.head_count += 1;
        }
    }

    fn touch_in_edge(nodes: &mut AvlTree<Id, Node>, ctx: &mut GraphContext, tail: Id, eid: Id) {
        let node = nodes.find_mut(&tail).expect("tail node must exist");
        let was_alone = node.status.contains(NodeStatus::ALONE);
        let was_tail = node.status.contains(NodeStatus::TAIL);
        node.in_edges.push(eid);
        node.refresh_status();
        if was_alone {
            ctx.alone_count -= 1;
        }
        if !was_tail {
            ctx.tail_count += 1;
        }
    }

    fn ensure_node(nodes: &mut AvlTree<Id, Node>, ctx: &mut GraphContext, id: Id) {
        if !nodes.contains(&id) {
            nodes.insert(id, Node::new_implicit(id, vec![0; ctx.node_attr_size as usize]));
            ctx.node_count += 1;
        }
    }

    /// Adds an edge from `head` to `tail`, creating either endpoint (with
    /// a zeroed attribute) if it does not already exist.
    ///
    /// `AddFlags::STRONG_CONNECT` also extends the edge's membership into
    /// the reverse direction's edgesets, without allocating a second edge
    /// record: this is a deliberate reinterpretation of the original's
    /// literal recursive self-call (which risks an edge-id collision
    /// against the v2/v3 edge map on the reverse call) that keeps faith
    /// with `spec.md`'s plain-language guarantee ("also adds the reverse
    /// edge") while sidestepping that collision (`DESIGN.md`,
    /// "STRONG_CONNECT").
    pub fn add_edge(&mut self, id: Id, head: Id, tail: Id, cost: i32, flags: AddFlags) -> Result<()> {
        self.add_edge_with_attrs(id, head, tail, cost, &[], flags)
    }

    pub fn add_edge_with_attrs(
        &mut self,
        id: Id,
        head: Id,
        tail: Id,
        cost: i32,
        attr: &[u8],
        flags: AddFlags,
    ) -> Result<()> {
        if attr.len() != self.ctx.edge_attr_size as usize {
            return Err(GraphError::BadArgument);
        }
        let has_edge_map = self.ctx.version.has_edge_map();
        let (nodes, edges, cost_index) = self.tree_mut()?;
        if has_edge_map && edges.contains(&id) {
            return Err(GraphError::EdgeAlreadyExist);
        }

        Self::ensure_node(nodes, &mut self.ctx, head);
        Self::ensure_node(nodes, &mut self.ctx, tail);

        let mut status = EdgeStatus::empty();
        if self.ctx.version != GraphVersion::V3 || flags.contains(AddFlags::DIRECTED) {
            status |= EdgeStatus::DIRECTED;
        }
        edges.insert(
            id,
            Edge {
                id,
                status,
                cost,
                head,
                tail,
                attr: attr.to_vec(),
            },
        );
        if let Some(ci) = cost_index {
            ci.insert((cost, id), ());
        }

        Self::touch_out_edge(nodes, &mut self.ctx, head, id);
        if has_edge_map {
            Self::touch_in_edge(nodes, &mut self.ctx, tail, id);
        }

        if flags.contains(AddFlags::STRONG_CONNECT) && has_edge_map {
            Self::touch_out_edge(nodes, &mut self.ctx, tail, id);
            Self::touch_in_edge(nodes, &mut self.ctx, head, id);
        }

        self.ctx.edge_count += 1;
        self.ctx.accumulated_cost += cost as i64;
        trace!("add_edge: id={id} head={head} tail={tail} cost={cost}");
        Ok(())
    }

    /// Removes edge `id`. Unsupported on v1 graphs.
    pub fn del_edge(&mut self, id: Id) -> Result<()> {
        if !self.ctx.version.has_edge_map() {
            return Err(GraphError::NotSupported);
        }
        let (nodes, edges, cost_index) = self.tree_mut()?;
        let edge = edges.delete(&id).ok_or(GraphError::EdgeNotFound)?;
        if let Some(ci) = cost_index {
            ci.delete(&(edge.cost, id));
        }
        // A STRONG_CONNECT edge was threaded into all four of
        // {head,tail}x{out,in}; retract it from every edgeset it might be
        // in rather than just the non-reversed pair, since the edge record
        // itself does not remember whether it was strong-connected.
        for node_id in [edge.head, edge.tail] {
            if let Some(node) = nodes.find_mut(&node_id) {
                node.out_edges.retain(|e| *e != id);
                node.in_edges.retain(|e| *e != id);
                node.refresh_status();
            }
        }
        self.recount();
        self.ctx.edge_count -= 1;
        self.ctx.accumulated_cost -= edge.cost as i64;
        trace!("del_edge: id={id}");
        Ok(())
    }

    pub fn get_edge(&self, id: Id) -> Result<Edge> {
        match &self.state {
            GraphState::Tree { edges, .. } => {
                edges.find(&id).cloned().ok_or(GraphError::EdgeNotFound)
            }
            GraphState::Flat {
                node_bytes,
                edge_bytes,
            } => {
                if !self.ctx.version.has_edge_map() {
                    return Err(GraphError::NotSupported);
                }
                let stride =
                    flatten::edge_record_words(self.ctx.version, self.ctx.edge_attr_size) * 4;
                let off = flatten::find_edge_offset(
                    edge_bytes,
                    stride,
                    self.ctx.edge_count as usize,
                    id,
                    self.ctx.endianness,
                )
                .ok_or(GraphError::EdgeNotFound)?;
                let e = self.ctx.endianness;
                let head_off = crate::io::get_i32(edge_bytes, off, e) as usize;
                let tail_off = crate::io::get_i32(edge_bytes, off + 4, e) as usize;
                let status =
                    EdgeStatus::from_bits_truncate(crate::io::get_u32(edge_bytes, off + 8, e));
                let cost = crate::io::get_i32(edge_bytes, off + 12, e);
                let attr_bytes = self.ctx.edge_attr_size as usize;
                let attr = edge_bytes[off + 20..off + 20 + attr_bytes].to_vec();
                let head = crate::io::get_i32(node_bytes, head_off, e);
                let tail = crate::io::get_i32(node_bytes, tail_off, e);
                Ok(Edge {
                    id,
                    status,
                    cost,
                    head,
                    tail,
                    attr,
                })
            }
        }
    }

    pub fn edge_attr_get(&self, id: Id) -> Result<Vec<u8>> {
        Ok(self.get_edge(id)?.attr)
    }

    pub fn edge_attr_set(&mut self, id: Id, attr: &[u8]) -> Result<()> {
        if attr.len() != self.ctx.edge_attr_size as usize {
            return Err(GraphError::BadArgument);
        }
        let (_, edges, _) = self.tree_mut()?;
        let edge = edges.find_mut(&id).ok_or(GraphError::EdgeNotFound)?;
        edge.attr.copy_from_slice(attr);
        Ok(())
    }

    // -- degree / valence ---------------------------------------------------

    /// The node's edgeset block's leading `(out_count, in_count)` words, in
    /// flat-state; `in_count` is `None` on v1 (no in-edgeset block).
    fn flat_edgeset_counts(&self, node_bytes: &[u8], edge_bytes: &[u8], id: Id) -> Result<(u32, Option<u32>)> {
        let e = self.ctx.endianness;
        let stride = flatten::node_stride_words(self.ctx.node_attr_size) * 4;
        let off = flatten::find_node_offset(node_bytes, stride, id, e).ok_or(GraphError::NodeNotFound)?;
        let edgeset_offset = crate::io::get_i32(node_bytes, off + 8, e);
        if edgeset_offset < 0 {
            return Ok((0, self.ctx.version.has_edge_map().then_some(0)));
        }
        let p = edgeset_offset as usize;
        let out_count = crate::io::get_u32(edge_bytes, p, e);
        if !self.ctx.version.has_edge_map() {
            return Ok((out_count, None));
        }
        let in_count = crate::io::get_u32(edge_bytes, p + 4 + 4 * out_count as usize, e);
        Ok((out_count, Some(in_count)))
    }

    pub fn out_degree(&self, id: Id) -> Result<u32> {
        match &self.state {
            GraphState::Tree { nodes, .. } => {
                Ok(nodes.find(&id).ok_or(GraphError::NodeNotFound)?.out_edges.len() as u32)
            }
            GraphState::Flat {
                node_bytes,
                edge_bytes,
            } => Ok(self.flat_edgeset_counts(node_bytes, edge_bytes, id)?.0),
        }
    }

    /// In-degree. Not supported on v1 (no in-edgeset). On v3, per the
    /// original library's delegation (confirmed from `graph.c`), this
    /// returns the same value as `valence`: an undirected graph's in- and
    /// out-edgesets are not tracked as distinct concepts for query
    /// purposes.
    pub fn in_degree(&self, id: Id) -> Result<u32> {
        if self.ctx.version == GraphVersion::V1 {
            return Err(GraphError::NotSupported);
        }
        if self.ctx.version == GraphVersion::V3 {
            return self.valence(id);
        }
        match &self.state {
            GraphState::Tree { nodes, .. } => {
                Ok(nodes.find(&id).ok_or(GraphError::NodeNotFound)?.in_edges.len() as u32)
            }
            GraphState::Flat {
                node_bytes,
                edge_bytes,
            } => Ok(self
                .flat_edgeset_counts(node_bytes, edge_bytes, id)?
                .1
                .expect("v2 always carries an in-edgeset block")),
        }
    }

    /// Total incident edges. On v2, `out_degree + in_degree`; on v1,
    /// `out_degree` alone (no in-edgeset); on v3, also `out_degree +
    /// in_degree` since undirected edges are still recorded in both
    /// directions' edgesets.
    pub fn valence(&self, id: Id) -> Result<u32> {
        match &self.state {
            GraphState::Tree { nodes, .. } => {
                let node = nodes.find(&id).ok_or(GraphError::NodeNotFound)?;
                Ok(match self.ctx.version {
                    GraphVersion::V1 => node.out_edges.len() as u32,
                    GraphVersion::V2 | GraphVersion::V3 => {
                        (node.out_edges.len() + node.in_edges.len()) as u32
                    }
                })
            }
            GraphState::Flat {
                node_bytes,
                edge_bytes,
            } => {
                let (out_count, in_count) = self.flat_edgeset_counts(node_bytes, edge_bytes, id)?;
                Ok(out_count + in_count.unwrap_or(0))
            }
        }
    }

    /// Recomputes `head_count`/`tail_count`/`alone_count` from scratch by
    /// walking every node. Used after `del_edge`, where a single edge
    /// deletion can affect two nodes' status in ways that are simpler to
    /// get right by recounting than by tracking every transition
    /// incrementally (`SPEC_FULL.md` §4.4).
    fn recount(&mut self) {
        let Ok((nodes, _)) = self.tree() else { return };
        let mut head = 0u32;
        let mut tail = 0u32;
        let mut alone = 0u32;
        for (_, node) in nodes.iter() {
            if node.status.contains(NodeStatus::HEAD) {
                head += 1;
            }
            if node.status.contains(NodeStatus::TAIL) {
                tail += 1;
            }
            if node.status.contains(NodeStatus::ALONE) {
                alone += 1;
            }
        }
        self.ctx.head_count = head;
        self.ctx.tail_count = tail;
        self.ctx.alone_count = alone;
    }

    // -- flatten / unflatten --------------------------------------------

    pub fn flatten(&mut self) -> Result<()> {
        if self.is_flat() {
            return Err(GraphError::BadOnFlatGraph);
        }
        let (nodes, edges) = self.tree()?;
        debug!("flatten: {} nodes, {} edges", nodes.len(), edges.len());
        let (node_bytes, edge_bytes) = flatten::flatten(&self.ctx, nodes, edges)?;
        debug!(
            "flatten: produced node_buf={} edge_buf={} bytes",
            node_bytes.len(),
            edge_bytes.len()
        );
        self.state = GraphState::Flat {
            node_bytes,
            edge_bytes,
        };
        Ok(())
    }

    pub fn unflatten(&mut self) -> Result<()> {
        let (node_bytes, edge_bytes) = match &self.state {
            GraphState::Flat {
                node_bytes,
                edge_bytes,
            } => (node_bytes, edge_bytes),
            GraphState::Tree { .. } => return Err(GraphError::BadOnTreeGraph),
        };
        debug!(
            "unflatten: node_buf={} edge_buf={} bytes",
            node_bytes.len(),
            edge_bytes.len()
        );
        let result = flatten::unflatten(&self.ctx, node_bytes, edge_bytes)?;
        self.ctx.head_count = result.head_count;
        self.ctx.tail_count = result.tail_count;
        self.ctx.alone_count = result.alone_count;
        self.ctx.edge_count = result.edge_count;
        self.ctx.accumulated_cost = result.accumulated_cost;
        self.ctx.node_count = result.nodes.len() as u32;
        let cost_index = self
            .ctx
            .options
            .contains(GraphOptions::EDGE_PRIORITIZE_COST)
            .then(|| {
                let mut ci = AvlTree::new();
                for (id, edge) in result.edges.iter() {
                    ci.insert((edge.cost, *id), ());
                }
                ci
            });
        debug!(
            "unflatten: produced {} nodes, {} edges",
            result.nodes.len(),
            result.edges.len()
        );
        self.state = GraphState::Tree {
            nodes: result.nodes,
            edges: result.edges,
            cost_index,
        };
        Ok(())
    }

    pub(crate) fn nodes(&self) -> Result<&AvlTree<Id, Node>> {
        Ok(self.tree()?.0)
    }

    pub(crate) fn edges(&self) -> Result<&AvlTree<Id, Edge>> {
        Ok(self.tree()?.1)
    }

    pub(crate) fn cost_index(&self) -> Option<&AvlTree<(i32, Id), ()>> {
        match &self.state {
            GraphState::Tree { cost_index, .. } => cost_index.as_ref(),
            GraphState::Flat { .. } => None,
        }
    }

    // -- traverser support -------------------------------------------------

    pub(crate) fn flat_node_ids(&self) -> Result<Vec<Id>> {
        match &self.state {
            GraphState::Flat { node_bytes, .. } => {
                let stride = flatten::node_stride_words(self.ctx.node_attr_size) * 4;
                let count = node_bytes.len() / stride;
                let e = self.ctx.endianness;
                Ok((0..count)
                    .map(|i| crate::io::get_i32(node_bytes, i * stride, e))
                    .collect())
            }
            GraphState::Tree { .. } => Err(GraphError::BadOnTreeGraph),
        }
    }

    pub(crate) fn flat_edge_ids(&self) -> Result<Vec<Id>> {
        match &self.state {
            GraphState::Flat { edge_bytes, .. } => {
                let stride =
                    flatten::edge_record_words(self.ctx.version, self.ctx.edge_attr_size) * 4;
                let count = self.ctx.edge_count as usize;
                let e = self.ctx.endianness;
                Ok((0..count)
                    .map(|i| crate::io::get_i32(edge_bytes, i * stride + 16, e))
                    .collect())
            }
            GraphState::Tree { .. } => Err(GraphError::BadOnTreeGraph),
        }
    }

    pub(crate) fn edgeset_ids(
        &self,
        node: Id,
        side: crate::traverse::EdgesetSide,
    ) -> Result<Vec<Id>> {
        use crate::traverse::EdgesetSide;
        match &self.state {
            GraphState::Tree { nodes, .. } => {
                let n = nodes.find(&node).ok_or(GraphError::NodeNotFound)?;
                Ok(match side {
                    EdgesetSide::Out => n.out_edges.clone(),
                    EdgesetSide::In => n.in_edges.clone(),
                })
            }
            GraphState::Flat {
                node_bytes,
                edge_bytes,
            } => {
                let e = self.ctx.endianness;
                let stride = flatten::node_stride_words(self.ctx.node_attr_size) * 4;
                let off = flatten::find_node_offset(node_bytes, stride, node, e)
                    .ok_or(GraphError::NodeNotFound)?;
                let edgeset_offset = crate::io::get_i32(node_bytes, off + 8, e);
                if edgeset_offset < 0 {
                    return Ok(Vec::new());
                }
                let p = edgeset_offset as usize;
                let out_count = crate::io::get_u32(edge_bytes, p, e) as usize;
                let has_map = self.ctx.version.has_edge_map();
                match side {
                    EdgesetSide::Out => {
                        let mut out = Vec::with_capacity(out_count);
                        let mut q = p + 4;
                        for _ in 0..out_count {
                            if has_map {
                                let rec_off = crate::io::get_i32(edge_bytes, q, e) as usize;
                                out.push(crate::io::get_i32(edge_bytes, rec_off + 16, e));
                                q += 4;
                            } else {
                                let edge_rec_words = flatten::edge_record_words(
                                    self.ctx.version,
                                    self.ctx.edge_attr_size,
                                );
                                out.push(crate::io::get_i32(edge_bytes, q + 12, e));
                                q += edge_rec_words * 4;
                            }
                        }
                        Ok(out)
                    }
                    EdgesetSide::In => {
                        if !has_map {
                            return Err(GraphError::NotSupported);
                        }
                        let mut q = p + 4 + 4 * out_count;
                        let in_count = crate::io::get_u32(edge_bytes, q, e) as usize;
                        q += 4;
                        let mut result = Vec::with_capacity(in_count);
                        for _ in 0..in_count {
                            let rec_off = crate::io::get_i32(edge_bytes, q, e) as usize;
                            result.push(crate::io::get_i32(edge_bytes, rec_off + 16, e));
                            q += 4;
                        }
                        Ok(result)
                    }
                }
            }
        }
    }

    pub(crate) fn out_edgeset_cost_ordered(&self, node: Id) -> Result<Vec<Id>> {
        let ids = self.edgeset_ids(node, crate::traverse::EdgesetSide::Out)?;
        let mut costed: Vec<(i32, Id)> = ids
            .iter()
            .map(|id| Ok((self.get_edge(*id)?.cost, *id)))
            .collect::<Result<_>>()?;
        costed.sort_unstable();
        Ok(costed.into_iter().map(|(_, id)| id).collect())
    }

    /// Every edge id in the graph, in nondecreasing cost order (ties broken
    /// by id): `spec.md` §4.8 "the edge-priority traverser". In tree-state
    /// with `GraphOptions::EDGE_PRIORITIZE_COST` set, reads straight off the
    /// maintained `cost_index` rather than re-sorting; otherwise sorts the
    /// edge map (or, in flat-state, the edge buffer) on demand.
    pub(crate) fn edges_cost_ordered(&self) -> Result<Vec<Id>> {
        if let Some(index) = self.cost_index() {
            return Ok(index.keys().map(|(_, id)| *id).collect());
        }
        let ids = match &self.state {
            GraphState::Tree { edges, .. } => edges.keys().copied().collect::<Vec<_>>(),
            GraphState::Flat { .. } => self.flat_edge_ids()?,
        };
        let mut costed: Vec<(i32, Id)> = ids
            .iter()
            .map(|id| Ok((self.get_edge(*id)?.cost, *id)))
            .collect::<Result<_>>()?;
        costed.sort_unstable();
        Ok(costed.into_iter().map(|(_, id)| id).collect())
    }

    /// Logs and returns an error unchanged; kept alongside the other
    /// mutation paths so a future caller-visible error-string lookup
    /// (`spec.md` §6 `error_string`) has one obvious place to read from.
    pub(crate) fn trace_err(op: &str, err: GraphError) -> GraphError {
        warn!("{op}: {err}");
        err
    }

    // -- persistence -----------------------------------------------------

    /// Writes the flat-state byte image (header + node buffer + edge
    /// buffer) to `sink`. The graph must already be flattened
    /// (`SPEC_FULL.md` §4.7 "Chunked I/O").
    pub fn write_full<W: std::io::Write>(&self, sink: &mut W) -> Result<()> {
        let (node_bytes, edge_bytes) = match &self.state {
            GraphState::Flat {
                node_bytes,
                edge_bytes,
            } => (node_bytes, edge_bytes),
            GraphState::Tree { .. } => return Err(GraphError::BadOnTreeGraph),
        };
        let header = crate::io::Header {
            version: self.ctx.version,
            endianness: self.ctx.endianness,
            node_attr_size: self.ctx.node_attr_size,
            edge_attr_size: self.ctx.edge_attr_size,
            opaque: self.ctx.opaque,
            options: self.ctx.options,
            family: self.ctx.family,
            accumulated_cost: self.ctx.accumulated_cost,
            node_count: self.ctx.node_count,
            head_count: self.ctx.head_count,
            tail_count: self.ctx.tail_count,
            alone_count: self.ctx.alone_count,
            edge_count: self.ctx.edge_count,
            node_buffer_size: node_bytes.len() as u32,
            edge_buffer_size: edge_bytes.len() as u32,
        };
        debug!(
            "write_full: header + node_buf={} edge_buf={} bytes",
            node_bytes.len(),
            edge_bytes.len()
        );
        crate::io::write_full(header, node_bytes, edge_bytes, sink)
    }

    /// Reads a flat-state byte image from `source`, producing a flat
    /// [`Graph`] ready for querying or [`Graph::unflatten`]. Node/edge words
    /// are renormalized to host endianness during the read
    /// (`SPEC_FULL.md` §9 "Endianness").
    pub fn read_full<R: std::io::Read>(source: &mut R) -> Result<Self> {
        let (header, node_bytes, edge_bytes) = crate::io::read_full(source)?;
        let ctx = GraphContext {
            version: header.version,
            endianness: header.endianness,
            node_attr_size: header.node_attr_size,
            edge_attr_size: header.edge_attr_size,
            opaque: header.opaque,
            options: header.options,
            family: header.family,
            accumulated_cost: header.accumulated_cost,
            node_count: header.node_count,
            head_count: header.head_count,
            tail_count: header.tail_count,
            alone_count: header.alone_count,
            edge_count: header.edge_count,
        };
        debug!(
            "read_full: node_buf={} edge_buf={} bytes",
            node_bytes.len(),
            edge_bytes.len()
        );
        Ok(Graph {
            ctx,
            state: GraphState::Flat {
                node_bytes,
                edge_bytes,
            },
        })
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_node_and_edge_updates_counters() {
        let mut g = Graph::new();
        g.add_node(1, &[], AddFlags::empty()).unwrap();
        g.add_node(2, &[], AddFlags::empty()).unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.ctx.alone_count, 2);

        g.add_edge(100, 1, 2, 5, AddFlags::empty()).unwrap();
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.accumulated_cost(), 5);
        assert_eq!(g.ctx.alone_count, 0);
        assert_eq!(g.ctx.head_count, 1);
        assert_eq!(g.ctx.tail_count, 1);
        assert_eq!(g.out_degree(1).unwrap(), 1);
        assert_eq!(g.in_degree(2).unwrap(), 1);
    }

    #[test]
    fn add_edge_implicitly_creates_endpoints_without_alone_credit() {
        let mut g = Graph::new();
        g.add_edge(1, 10, 20, 3, AddFlags::empty()).unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.ctx.alone_count, 0);
    }

    #[test]
    fn self_loop_sets_both_head_and_tail() {
        let mut g = Graph::new();
        g.add_node(1, &[], AddFlags::empty()).unwrap();
        g.add_edge(50, 1, 1, 1, AddFlags::empty()).unwrap();
        let status = g.status(1).unwrap();
        assert!(status.contains(NodeStatus::HEAD));
        assert!(status.contains(NodeStatus::TAIL));
        assert_eq!(g.ctx.alone_count, 0);
        assert_eq!(g.ctx.head_count, 1);
        assert_eq!(g.ctx.tail_count, 1);
    }

    #[test]
    fn del_edge_restores_alone_status() {
        let mut g = Graph::new();
        g.add_edge(1, 10, 20, 3, AddFlags::empty()).unwrap();
        g.del_edge(1).unwrap();
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.accumulated_cost(), 0);
        let status = g.status(10).unwrap();
        assert!(status.contains(NodeStatus::ALONE));
    }

    #[test]
    fn v1_rejects_del_edge_and_in_degree() {
        let mut g = GraphBuilder::new().version(GraphVersion::V1).build();
        g.add_edge(1, 10, 20, 3, AddFlags::empty()).unwrap();
        assert_eq!(g.del_edge(1), Err(GraphError::NotSupported));
        assert_eq!(g.in_degree(10), Err(GraphError::NotSupported));
        assert_eq!(g.valence(10).unwrap(), 1);
    }

    #[test]
    fn del_edge_retracts_a_strong_connected_edge_from_all_four_edgesets() {
        let mut g = Graph::new();
        g.add_edge(1, 10, 20, 3, AddFlags::STRONG_CONNECT).unwrap();
        assert_eq!(g.out_degree(10).unwrap(), 1);
        assert_eq!(g.in_degree(10).unwrap(), 1);
        assert_eq!(g.out_degree(20).unwrap(), 1);
        assert_eq!(g.in_degree(20).unwrap(), 1);

        g.del_edge(1).unwrap();
        assert_eq!(g.out_degree(10).unwrap(), 0);
        assert_eq!(g.in_degree(10).unwrap(), 0);
        assert_eq!(g.out_degree(20).unwrap(), 0);
        assert_eq!(g.in_degree(20).unwrap(), 0);
        assert!(g.status(10).unwrap().contains(NodeStatus::ALONE));
        assert!(g.status(20).unwrap().contains(NodeStatus::ALONE));
    }

    #[test]
    fn strong_connect_makes_edge_bidirectional_without_double_counting() {
        let mut g = Graph::new();
        g.add_edge(1, 10, 20, 3, AddFlags::STRONG_CONNECT).unwrap();
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.accumulated_cost(), 3);
        assert_eq!(g.out_degree(10).unwrap(), 1);
        assert_eq!(g.out_degree(20).unwrap(), 1);
        assert_eq!(g.in_degree(10).unwrap(), 1);
        assert_eq!(g.in_degree(20).unwrap(), 1);
    }

    #[test]
    fn flatten_then_query_then_unflatten_round_trips() {
        let mut g = Graph::new();
        g.add_node(1, &[], AddFlags::empty()).unwrap();
        g.add_edge(100, 1, 2, 7, AddFlags::empty()).unwrap();
        g.flatten().unwrap();
        assert!(g.is_flat());
        assert_eq!(g.out_degree(1).unwrap(), 1);
        assert_eq!(g.in_degree(2).unwrap(), 1);
        let edge = g.get_edge(100).unwrap();
        assert_eq!(edge.head, 1);
        assert_eq!(edge.tail, 2);
        assert_eq!(edge.cost, 7);
        g.unflatten().unwrap();
        assert!(!g.is_flat());
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn write_full_then_read_full_round_trips() {
        let mut g = Graph::new();
        g.add_edge(1, 10, 20, 3, AddFlags::empty()).unwrap();
        g.add_edge(2, 20, 30, 1, AddFlags::empty()).unwrap();
        g.flatten().unwrap();

        let mut buf = Vec::new();
        g.write_full(&mut buf).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let mut back = Graph::read_full(&mut cursor).unwrap();
        assert!(back.is_flat());
        assert_eq!(back.node_count(), 3);
        assert_eq!(back.edge_count(), 2);
        assert_eq!(back.accumulated_cost(), 4);
        assert_eq!(back.get_edge(1).unwrap().cost, 3);

        back.unflatten().unwrap();
        assert!(!back.is_flat());
        assert_eq!(back.out_degree(10).unwrap(), 1);
    }
}
