//! Bridge ↔ arc association and crossing detection.
//!
//! A bridge is *crossed* by a path when its point lies within the proximity
//! tolerance of any traversed arc's geometry.  The geometric work is done
//! once, in [`BridgeIndex::build`]: an R-tree over bridge points is probed
//! with the tolerance-expanded envelope of every arc piece.  After that,
//! crossing detection for a path is a pure lookup over arc → bridge
//! associations, and the same association gives the arcs to bar when a
//! bridge is closed.

use std::collections::BTreeSet;

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;

use bd_core::{Bridge, BridgeId, EdgeId, MapPoint};

use crate::network::RoadNetwork;
use crate::solver::Barriers;

// ── R-tree bridge entry ───────────────────────────────────────────────────────

#[derive(Clone)]
struct BridgeEntry {
    point: [f64; 2],
    idx:   u32,
}

impl RTreeObject for BridgeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for BridgeEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── BridgeIndex ───────────────────────────────────────────────────────────────

/// Precomputed association between bridges and network arcs.
///
/// Bridges are addressed by their position in the slice passed to
/// [`build`](Self::build) ("bridge index"); [`bridge`](Self::bridge) maps an
/// index back to its record.
pub struct BridgeIndex {
    bridges:      Vec<Bridge>,
    tolerance:    f64,
    /// Arc → bridge indices within tolerance, sorted ascending.
    edge_bridges: FxHashMap<EdgeId, Vec<u32>>,
    /// Bridge index → arcs within tolerance, sorted ascending.
    bridge_edges: Vec<Vec<EdgeId>>,
}

impl BridgeIndex {
    /// Associate every bridge with the arcs passing within `tolerance`.
    ///
    /// Time complexity: O(B log B) for the bulk load plus one envelope query
    /// per arc piece.
    pub fn build(network: &RoadNetwork, bridges: &[Bridge], tolerance: f64) -> Self {
        let entries: Vec<BridgeEntry> = bridges
            .iter()
            .enumerate()
            .map(|(i, b)| BridgeEntry { point: b.pos.to_array(), idx: i as u32 })
            .collect();
        let tree = RTree::bulk_load(entries);

        let tol_2 = tolerance * tolerance;
        let mut edge_bridges: FxHashMap<EdgeId, Vec<u32>> = FxHashMap::default();
        let mut bridge_edges: Vec<Vec<EdgeId>> = vec![Vec::new(); bridges.len()];

        if !bridges.is_empty() {
            for e in 0..network.edge_count() {
                let edge = EdgeId(e as u32);
                let geometry = network.edge_geometry(edge);
                let mut hits: Vec<u32> = Vec::new();

                for piece in geometry.windows(2) {
                    let (a, b) = (piece[0], piece[1]);
                    let envelope = AABB::from_corners(
                        [a.x.min(b.x) - tolerance, a.y.min(b.y) - tolerance],
                        [a.x.max(b.x) + tolerance, a.y.max(b.y) + tolerance],
                    );
                    for entry in tree.locate_in_envelope(&envelope) {
                        let p = MapPoint::new(entry.point[0], entry.point[1]);
                        if p.distance_2_to_segment(a, b) <= tol_2 {
                            hits.push(entry.idx);
                        }
                    }
                }

                if hits.is_empty() {
                    continue;
                }
                hits.sort_unstable();
                hits.dedup();
                for &idx in &hits {
                    bridge_edges[idx as usize].push(edge);
                }
                edge_bridges.insert(edge, hits);
            }
        }

        Self { bridges: bridges.to_vec(), tolerance, edge_bridges, bridge_edges }
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn bridge(&self, idx: usize) -> &Bridge {
        &self.bridges[idx]
    }

    pub fn bridges(&self) -> &[Bridge] {
        &self.bridges
    }

    /// Arcs within tolerance of bridge `idx`.  Empty for a bridge that sits
    /// off the network.
    pub fn edges_near(&self, idx: usize) -> &[EdgeId] {
        &self.bridge_edges[idx]
    }

    /// Indices of the bridges a path crosses, ascending and deduplicated.
    ///
    /// Independent of the order of `edges`.
    pub fn crossed_indices(&self, edges: &[EdgeId]) -> Vec<usize> {
        let mut out: Vec<usize> = edges
            .iter()
            .filter_map(|e| self.edge_bridges.get(e))
            .flatten()
            .map(|&i| i as usize)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Identifiers of the bridges a path crosses.
    pub fn crossed_bridges(&self, edges: &[EdgeId]) -> BTreeSet<BridgeId> {
        self.crossed_indices(edges)
            .into_iter()
            .map(|i| self.bridges[i].id.clone())
            .collect()
    }

    /// Barrier set closing bridge `idx`: every arc within tolerance of it,
    /// in both travel directions.
    pub fn barriers_for(&self, idx: usize) -> Barriers {
        let mut barriers = Barriers::none();
        barriers.bar_edges(self.bridge_edges[idx].iter().copied());
        barriers
    }
}
