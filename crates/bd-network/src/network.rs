//! Road network representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing arcs.
//! Given a `NodeId n`, its outgoing arcs occupy the slice:
//!
//! ```text
//! edge_to[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! All arc arrays (`edge_from`, `edge_to`, `edge_cost`, `edge_segment`,
//! `edge_shape`) are sorted by source node and indexed by `EdgeId`.
//! Iteration over a node's outgoing arcs is a contiguous memory scan, which
//! keeps the Dijkstra inner loop cheap across the many barred re-solves.
//!
//! # Segments
//!
//! Each arc references the real-world network segment (source feature) it
//! was derived from.  A bidirectional segment yields two arcs sharing one
//! `SegmentId`; a segment split at intersections yields many.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps `(x, y)` to the nearest `NodeId`.  Used to
//! snap business and destination points onto the network.

use std::collections::{BTreeSet, HashMap};

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use bd_core::{EdgeId, MapPoint, NodeId, SegmentId};

use crate::{NetworkError, NetworkResult};

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Entry stored in the node R-tree: an `[x, y]` point with its `NodeId`.
#[derive(Clone)]
struct NodeEntry {
    point: [f64; 2],
    id:    NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── Segment ───────────────────────────────────────────────────────────────────

/// A real-world network segment: source feature class name plus object id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Segment {
    pub source:     String,
    pub source_oid: i64,
}

impl Segment {
    /// Composite display key, e.g. `Network_LocalStreets1042`.
    pub fn key(&self) -> String {
        format!("{}{}", self.source, self.source_oid)
    }
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Directed road graph in CSR format plus a spatial index for node snapping.
///
/// Immutable once built; shared by reference across every solver call.  Do
/// not construct directly; use [`RoadNetworkBuilder`].
pub struct RoadNetwork {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<MapPoint>,

    /// `true` if at least one incident arc may be snapped onto.
    pub node_snappable: Vec<bool>,

    // ── CSR adjacency ─────────────────────────────────────────────────────
    /// CSR row pointer.  Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    // ── Arc data (indexed by EdgeId = position in sorted order) ───────────
    /// Source node of each arc, needed to walk `prev_edge` back to the origin.
    pub edge_from: Vec<NodeId>,

    pub edge_to: Vec<NodeId>,

    /// Impedance (e.g. length) of each arc.  Non-negative and finite.
    pub edge_cost: Vec<f64>,

    /// Real-world segment each arc was derived from.
    pub edge_segment: Vec<SegmentId>,

    /// Interior shape vertices of each arc, in travel order.  Empty for a
    /// straight arc between its end nodes.
    edge_shape: Vec<Vec<MapPoint>>,

    /// Segment table, indexed by `SegmentId`.
    pub segments: Vec<Segment>,

    // ── Spatial index ─────────────────────────────────────────────────────
    spatial_idx: RTree<NodeEntry>,
}

impl RoadNetwork {
    /// Construct an empty network with no nodes or arcs.
    pub fn empty() -> Self {
        Self {
            node_pos:       Vec::new(),
            node_snappable: Vec::new(),
            node_out_start: vec![0],
            edge_from:      Vec::new(),
            edge_to:        Vec::new(),
            edge_cost:      Vec::new(),
            edge_segment:   Vec::new(),
            edge_shape:     Vec::new(),
            segments:       Vec::new(),
            spatial_idx:    RTree::new(),
        }
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over the `EdgeId`s of all outgoing arcs from `node`.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        end - start
    }

    #[inline]
    pub fn contains_node(&self, node: NodeId) -> bool {
        node.index() < self.node_count()
    }

    /// The segment record an arc was derived from.
    pub fn segment_of(&self, edge: EdgeId) -> &Segment {
        &self.segments[self.edge_segment[edge.index()].index()]
    }

    /// Full polyline of an arc: start node, interior vertices, end node.
    pub fn edge_geometry(&self, edge: EdgeId) -> Vec<MapPoint> {
        let i = edge.index();
        let mut pts = Vec::with_capacity(self.edge_shape[i].len() + 2);
        pts.push(self.node_pos[self.edge_from[i].index()]);
        pts.extend_from_slice(&self.edge_shape[i]);
        pts.push(self.node_pos[self.edge_to[i].index()]);
        pts
    }

    /// Distinct source names present in the segment table.
    pub fn source_names(&self) -> BTreeSet<&str> {
        self.segments.iter().map(|s| s.source.as_str()).collect()
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Nearest node of any kind.  `None` only if the network has no nodes.
    pub fn snap_to_node(&self, pos: MapPoint) -> Option<NodeId> {
        self.spatial_idx
            .nearest_neighbor(&pos.to_array())
            .map(|e| e.id)
    }

    /// Nearest node reachable through a snappable arc.
    ///
    /// Businesses join the network only via ordinary streets, never directly
    /// onto a limited-access highway.  Returns `None` if no node qualifies.
    pub fn snap_to_snappable_node(&self, pos: MapPoint) -> Option<NodeId> {
        self.spatial_idx
            .nearest_neighbor_iter(&pos.to_array())
            .find(|e| self.node_snappable[e.id.index()])
            .map(|e| e.id)
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// One input network edge before CSR construction.
#[derive(Clone, Debug)]
pub struct InputEdge {
    pub from:          NodeId,
    pub to:            NodeId,
    pub cost:          f64,
    pub segment:       SegmentId,
    pub bidirectional: bool,
    /// Interior vertices in `from → to` order.
    pub shape:         Vec<MapPoint>,
}

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use std::collections::BTreeSet;
/// use bd_core::MapPoint;
/// use bd_network::RoadNetworkBuilder;
///
/// let mut b = RoadNetworkBuilder::new();
/// let a = b.add_node(MapPoint::new(0.0, 0.0));
/// let c = b.add_node(MapPoint::new(1_000.0, 0.0));
/// let seg = b.add_segment("Network_LocalStreets", 1);
/// b.add_road(a, c, 1_000.0, seg);
/// let net = b.build(&BTreeSet::new()).unwrap();
/// assert_eq!(net.node_count(), 2);
/// assert_eq!(net.edge_count(), 2); // bidirectional
/// ```
pub struct RoadNetworkBuilder {
    nodes:          Vec<MapPoint>,
    segments:       Vec<Segment>,
    segment_lookup: HashMap<Segment, SegmentId>,
    raw_edges:      Vec<RawEdge>,
    inputs:         usize,
}

struct RawEdge {
    from:    NodeId,
    to:      NodeId,
    cost:    f64,
    segment: SegmentId,
    shape:   Vec<MapPoint>,
    /// Position in the input, reported in validation errors.
    input:   usize,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self {
            nodes:          Vec::new(),
            segments:       Vec::new(),
            segment_lookup: HashMap::new(),
            raw_edges:      Vec::new(),
            inputs:         0,
        }
    }

    /// Pre-allocate for the expected number of nodes and arcs.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes:     Vec::with_capacity(nodes),
            raw_edges: Vec::with_capacity(edges),
            ..Self::new()
        }
    }

    /// Add a node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, pos: MapPoint) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        id
    }

    /// Register a source segment, returning the existing id on repeats.
    pub fn add_segment(&mut self, source: impl Into<String>, source_oid: i64) -> SegmentId {
        let seg = Segment { source: source.into(), source_oid };
        if let Some(&id) = self.segment_lookup.get(&seg) {
            return id;
        }
        let id = SegmentId(self.segments.len() as u32);
        self.segments.push(seg.clone());
        self.segment_lookup.insert(seg, id);
        id
    }

    /// Add one input edge: a single arc if one-way, two arcs otherwise.
    ///
    /// Validation is deferred to [`build`](Self::build).
    pub fn add_edge(&mut self, edge: InputEdge) {
        let input = self.inputs;
        self.inputs += 1;
        let reversed = edge.bidirectional.then(|| edge.shape.iter().rev().copied().collect());
        self.push_arc(edge.from, edge.to, edge.cost, edge.segment, edge.shape, input);
        if let Some(shape) = reversed {
            self.push_arc(edge.to, edge.from, edge.cost, edge.segment, shape, input);
        }
    }

    /// Add a **directed** straight arc from `from` to `to`.
    pub fn add_directed_edge(&mut self, from: NodeId, to: NodeId, cost: f64, segment: SegmentId) {
        self.add_edge(InputEdge { from, to, cost, segment, bidirectional: false, shape: Vec::new() });
    }

    /// Convenience: straight arcs in **both directions**.
    pub fn add_road(&mut self, a: NodeId, b: NodeId, cost: f64, segment: SegmentId) {
        self.add_edge(InputEdge { from: a, to: b, cost, segment, bidirectional: true, shape: Vec::new() });
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn arc_count(&self) -> usize { self.raw_edges.len() }

    fn push_arc(
        &mut self,
        from:    NodeId,
        to:      NodeId,
        cost:    f64,
        segment: SegmentId,
        shape:   Vec<MapPoint>,
        input:   usize,
    ) {
        self.raw_edges.push(RawEdge { from, to, cost, segment, shape, input });
    }

    /// Consume the builder and produce a [`RoadNetwork`].
    ///
    /// Arcs whose segment source name is in `restricted_sources` are marked
    /// non-snappable.
    ///
    /// # Errors
    ///
    /// [`NetworkError::DanglingEdge`] if an arc references a node that was
    /// never added, [`NetworkError::InvalidCost`] for a negative or
    /// non-finite cost, [`NetworkError::Malformed`] for an unknown segment.
    pub fn build(self, restricted_sources: &BTreeSet<String>) -> NetworkResult<RoadNetwork> {
        let node_count = self.nodes.len();

        for e in &self.raw_edges {
            for node in [e.from, e.to] {
                if node.index() >= node_count {
                    return Err(NetworkError::DanglingEdge { edge: e.input, node });
                }
            }
            if !e.cost.is_finite() || e.cost < 0.0 {
                return Err(NetworkError::InvalidCost { edge: e.input, cost: e.cost });
            }
            if e.segment.index() >= self.segments.len() {
                return Err(NetworkError::Malformed(format!(
                    "edge {} references unknown segment {}",
                    e.input, e.segment
                )));
            }
        }

        // Stable sort keeps input order within a node, so expansion order
        // (and therefore tie-breaking) is reproducible.
        let mut raw = self.raw_edges;
        raw.sort_by_key(|e| e.from.0);

        let segment_snappable: Vec<bool> = self
            .segments
            .iter()
            .map(|s| !restricted_sources.contains(&s.source))
            .collect();

        let edge_count = raw.len();
        let mut edge_from      = Vec::with_capacity(edge_count);
        let mut edge_to        = Vec::with_capacity(edge_count);
        let mut edge_cost      = Vec::with_capacity(edge_count);
        let mut edge_segment   = Vec::with_capacity(edge_count);
        let mut edge_shape     = Vec::with_capacity(edge_count);
        let mut node_snappable = vec![false; node_count];
        let mut node_out_start = vec![0u32; node_count + 1];

        for e in raw {
            if segment_snappable[e.segment.index()] {
                node_snappable[e.from.index()] = true;
                node_snappable[e.to.index()] = true;
            }
            node_out_start[e.from.index() + 1] += 1;
            edge_from.push(e.from);
            edge_to.push(e.to);
            edge_cost.push(e.cost);
            edge_segment.push(e.segment);
            edge_shape.push(e.shape);
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, edge_count);

        let entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry { point: pos.to_array(), id: NodeId(i as u32) })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        Ok(RoadNetwork {
            node_pos: self.nodes,
            node_snappable,
            node_out_start,
            edge_from,
            edge_to,
            edge_cost,
            edge_segment,
            edge_shape,
            segments: self.segments,
            spatial_idx,
        })
    }
}

impl Default for RoadNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
