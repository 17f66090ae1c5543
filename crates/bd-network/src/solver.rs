//! Barrier-constrained shortest paths to the nearest of several targets.
//!
//! # Pluggability
//!
//! The detour engine calls routing via the [`Solver`] trait, so a faster
//! implementation (bidirectional search, contraction hierarchies with
//! customisable barriers) can be swapped in without touching the engine.
//! The default [`DijkstraSolver`] is a plain one-to-nearest Dijkstra.
//!
//! # Barriers
//!
//! A [`Barriers`] set is a solver-local view: barred nodes and arcs are
//! skipped for the duration of one call.  The network itself is never
//! mutated, so one `&RoadNetwork` serves any number of concurrent calls with
//! different barrier sets.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};

use bd_core::{EdgeId, NodeId};

use crate::network::RoadNetwork;
use crate::{SolverError, SolverResult};

// ── Barriers ──────────────────────────────────────────────────────────────────

/// Nodes and arcs treated as removed for one solver call.
#[derive(Clone, Debug, Default)]
pub struct Barriers {
    nodes: FxHashSet<NodeId>,
    edges: FxHashSet<EdgeId>,
}

impl Barriers {
    /// The empty set: the baseline, unconstrained network.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn bar_node(&mut self, node: NodeId) -> &mut Self {
        self.nodes.insert(node);
        self
    }

    pub fn bar_edge(&mut self, edge: EdgeId) -> &mut Self {
        self.edges.insert(edge);
        self
    }

    pub fn bar_edges(&mut self, edges: impl IntoIterator<Item = EdgeId>) -> &mut Self {
        self.edges.extend(edges);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    #[inline]
    pub fn blocks_node(&self, node: NodeId) -> bool {
        !self.nodes.is_empty() && self.nodes.contains(&node)
    }

    #[inline]
    pub fn blocks_edge(&self, edge: EdgeId) -> bool {
        !self.edges.is_empty() && self.edges.contains(&edge)
    }
}

// ── Targets ───────────────────────────────────────────────────────────────────

/// An ordered set of destination nodes for one direction.
///
/// The order is the caller's destination order; when several destination
/// points snap to the same node, the earliest keeps its rank.
#[derive(Clone, Debug, Default)]
pub struct Targets {
    nodes: Vec<NodeId>,
    rank:  FxHashMap<NodeId, usize>,
}

impl Targets {
    pub fn new(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        let mut targets = Self::default();
        for node in nodes {
            let next = targets.rank.len();
            targets.rank.entry(node).or_insert_with(|| {
                targets.nodes.push(node);
                next
            });
        }
        targets
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    #[inline]
    pub fn rank(&self, node: NodeId) -> Option<usize> {
        self.rank.get(&node).copied()
    }
}

// ── Route / PathOutcome ───────────────────────────────────────────────────────

/// A solved path: the traversed arcs in order and their total impedance.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Arcs to traverse in order, from origin to destination.
    pub edges: Vec<EdgeId>,
    pub cost: f64,
    /// The destination node actually reached.
    pub destination: NodeId,
}

impl Route {
    /// `true` if the origin already was a destination.
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Result of one shortest-path call.
#[derive(Debug, Clone, PartialEq)]
pub enum PathOutcome {
    Reached(Route),
    /// No target can be reached without crossing a barrier.
    Unreachable,
}

impl PathOutcome {
    pub fn route(&self) -> Option<&Route> {
        match self {
            PathOutcome::Reached(r) => Some(r),
            PathOutcome::Unreachable => None,
        }
    }

    pub fn into_route(self) -> Option<Route> {
        match self {
            PathOutcome::Reached(r) => Some(r),
            PathOutcome::Unreachable => None,
        }
    }

    pub fn cost(&self) -> Option<f64> {
        self.route().map(|r| r.cost)
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, PathOutcome::Unreachable)
    }
}

// ── Solver trait ──────────────────────────────────────────────────────────────

/// Pluggable shortest-path engine.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so one solver can be shared across
/// Rayon worker threads; every call is read-only against the network.
pub trait Solver: Send + Sync {
    /// Shortest path from `origin` to the nearest node of `targets`, never
    /// entering a barred node or traversing a barred arc.
    fn shortest_path(
        &self,
        network:  &RoadNetwork,
        origin:   NodeId,
        targets:  &Targets,
        barriers: &Barriers,
    ) -> SolverResult<PathOutcome>;
}

// ── DijkstraSolver ────────────────────────────────────────────────────────────

/// Single-source Dijkstra that stops at the first settled target.
///
/// Ties are resolved by discovery order: among heap entries of equal cost,
/// the one pushed first is popped first.  Combined with the stable arc order
/// of [`RoadNetwork`], equidistant destinations always resolve the same way.
pub struct DijkstraSolver;

impl Solver for DijkstraSolver {
    fn shortest_path(
        &self,
        network:  &RoadNetwork,
        origin:   NodeId,
        targets:  &Targets,
        barriers: &Barriers,
    ) -> SolverResult<PathOutcome> {
        dijkstra(network, origin, targets, barriers)
    }
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

#[derive(Copy, Clone)]
struct State {
    cost: f64,
    seq:  u64,
    node: NodeId,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by cost, then by discovery sequence.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

fn dijkstra(
    network:  &RoadNetwork,
    origin:   NodeId,
    targets:  &Targets,
    barriers: &Barriers,
) -> SolverResult<PathOutcome> {
    if !network.contains_node(origin) {
        return Err(SolverError::OriginNotFound(origin));
    }
    if targets.is_empty() {
        return Err(SolverError::NoTargets);
    }
    if let Some(&bad) = targets.nodes().iter().find(|&&t| !network.contains_node(t)) {
        return Err(SolverError::TargetNotFound(bad));
    }
    if barriers.blocks_node(origin) {
        return Ok(PathOutcome::Unreachable);
    }

    let n = network.node_count();
    let mut dist      = vec![f64::INFINITY; n];
    let mut prev_edge = vec![EdgeId::INVALID; n];
    let mut seq: u64 = 0;

    dist[origin.index()] = 0.0;
    let mut heap = BinaryHeap::new();
    heap.push(State { cost: 0.0, seq, node: origin });

    while let Some(State { cost, node, .. }) = heap.pop() {
        // Skip stale heap entries.
        if cost > dist[node.index()] {
            continue;
        }

        if targets.rank(node).is_some() {
            return Ok(PathOutcome::Reached(reconstruct(network, &prev_edge, node, cost)));
        }

        for edge in network.out_edges(node) {
            if barriers.blocks_edge(edge) {
                continue;
            }
            let next = network.edge_to[edge.index()];
            if barriers.blocks_node(next) {
                continue;
            }
            let next_cost = cost + network.edge_cost[edge.index()];
            if next_cost < dist[next.index()] {
                dist[next.index()] = next_cost;
                prev_edge[next.index()] = edge;
                seq += 1;
                heap.push(State { cost: next_cost, seq, node: next });
            }
        }
    }

    Ok(PathOutcome::Unreachable)
}

fn reconstruct(
    network:   &RoadNetwork,
    prev_edge: &[EdgeId],
    to:        NodeId,
    cost:      f64,
) -> Route {
    let mut edges = Vec::new();
    let mut cur = to;
    loop {
        let e = prev_edge[cur.index()];
        if e == EdgeId::INVALID {
            break;
        }
        edges.push(e);
        cur = network.edge_from[e.index()];
    }
    edges.reverse();
    Route { edges, cost, destination: to }
}
