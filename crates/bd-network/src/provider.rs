//! Network data provider: the boundary to persisted input data.
//!
//! # CSV layout
//!
//! [`CsvProvider`] reads five files from one directory:
//!
//! | File               | Columns                                             |
//! |--------------------|-----------------------------------------------------|
//! | `nodes.csv`        | `node_id,x,y`                                       |
//! | `edges.csv`        | `from,to,cost,source,source_oid,oneway[,shape]`     |
//! | `businesses.csv`   | `business_id,x,y,truck_int_raw`                     |
//! | `bridges.csv`      | `bridge_id,x,y`                                     |
//! | `destinations.csv` | `direction,x,y`                                     |
//!
//! `node_id` values are arbitrary integers, remapped to dense `NodeId`s.
//! `oneway` accepts `0`/`1`/`true`/`false`/`yes`/`no`.  `shape` is an
//! optional `x y;x y;…` list of interior vertices in `from → to` order.
//!
//! Directions keep the order in which they first appear in
//! `destinations.csv`.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use bd_core::{AnalysisConfig, Bridge, Business, BusinessId, DestinationSet, Direction, MapPoint, NodeId};

use crate::network::{InputEdge, RoadNetwork, RoadNetworkBuilder};
use crate::{NetworkError, NetworkResult};

// ── Provider trait ────────────────────────────────────────────────────────────

/// Supplies the network and the point layers an analysis runs over.
pub trait NetworkProvider {
    /// Build the network, marking sources restricted by `config` as
    /// non-snappable.
    fn load_network(&self, config: &AnalysisConfig) -> NetworkResult<RoadNetwork>;

    /// One destination set per direction.
    fn list_destination_sets(&self) -> NetworkResult<Vec<DestinationSet>>;

    /// Businesses with their raw truck intensity.
    fn list_businesses(&self) -> NetworkResult<Vec<Business>>;

    fn list_bridges(&self) -> NetworkResult<Vec<Bridge>>;
}

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NodeRecord {
    node_id: i64,
    x:       f64,
    y:       f64,
}

#[derive(Deserialize)]
struct EdgeRecord {
    from:       i64,
    to:         i64,
    cost:       f64,
    source:     String,
    source_oid: i64,
    oneway:     String,
    #[serde(default)]
    shape:      Option<String>,
}

#[derive(Deserialize)]
struct BusinessRecord {
    business_id:   u32,
    x:             f64,
    y:             f64,
    truck_int_raw: f64,
}

#[derive(Deserialize)]
struct BridgeRecord {
    bridge_id: String,
    x:         f64,
    y:         f64,
}

#[derive(Deserialize)]
struct DestinationRecord {
    direction: String,
    x:         f64,
    y:         f64,
}

// ── CsvProvider ───────────────────────────────────────────────────────────────

/// Reads the CSV layout described in the module docs from `dir`.
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn open(&self, name: &str) -> NetworkResult<File> {
        Ok(File::open(self.dir.join(name))?)
    }
}

impl NetworkProvider for CsvProvider {
    fn load_network(&self, config: &AnalysisConfig) -> NetworkResult<RoadNetwork> {
        let net = read_network(self.open("nodes.csv")?, self.open("edges.csv")?, config)?;
        info!(
            "loaded network from {}: {} nodes, {} arcs, {} segments",
            self.dir.display(),
            net.node_count(),
            net.edge_count(),
            net.segment_count()
        );
        Ok(net)
    }

    fn list_destination_sets(&self) -> NetworkResult<Vec<DestinationSet>> {
        read_destinations(self.open("destinations.csv")?)
    }

    fn list_businesses(&self) -> NetworkResult<Vec<Business>> {
        read_businesses(self.open("businesses.csv")?)
    }

    fn list_bridges(&self) -> NetworkResult<Vec<Bridge>> {
        read_bridges(self.open("bridges.csv")?)
    }
}

// ── Reader-level API ──────────────────────────────────────────────────────────

/// Build a network from `nodes.csv` and `edges.csv` contents.
///
/// Accepts any `Read` source, so tests can pass a `std::io::Cursor`.
///
/// # Errors
///
/// [`NetworkError::Malformed`] for duplicate node ids or an edge naming an
/// unknown node id; the builder's errors for bad costs.
pub fn read_network<N: Read, E: Read>(
    nodes:  N,
    edges:  E,
    config: &AnalysisConfig,
) -> NetworkResult<RoadNetwork> {
    let mut builder = RoadNetworkBuilder::new();
    let mut ext_to_id: HashMap<i64, NodeId> = HashMap::new();

    for result in csv::Reader::from_reader(nodes).deserialize::<NodeRecord>() {
        let row = result?;
        let id = builder.add_node(MapPoint::new(row.x, row.y));
        if ext_to_id.insert(row.node_id, id).is_some() {
            return Err(NetworkError::Malformed(format!("duplicate node_id {}", row.node_id)));
        }
    }

    let mut sources: BTreeSet<String> = BTreeSet::new();
    for (i, result) in csv::Reader::from_reader(edges).deserialize::<EdgeRecord>().enumerate() {
        let row = result?;
        let lookup = |ext: i64| {
            ext_to_id.get(&ext).copied().ok_or_else(|| {
                NetworkError::Malformed(format!("edge {i} references unknown node_id {ext}"))
            })
        };
        let from = lookup(row.from)?;
        let to = lookup(row.to)?;
        let oneway = parse_flag(&row.oneway)
            .ok_or_else(|| NetworkError::Malformed(format!("edge {i}: bad oneway value {:?}", row.oneway)))?;
        let shape = match row.shape.as_deref() {
            None => Vec::new(),
            Some(s) => parse_shape(s)
                .ok_or_else(|| NetworkError::Malformed(format!("edge {i}: bad shape {s:?}")))?,
        };
        let segment = builder.add_segment(row.source.clone(), row.source_oid);
        sources.insert(row.source);
        builder.add_edge(InputEdge {
            from,
            to,
            cost: row.cost,
            segment,
            bidirectional: !oneway,
            shape,
        });
    }

    let restricted = config.restricted_set(sources.iter().map(String::as_str));
    builder.build(&restricted)
}

/// Read `businesses.csv` contents.  Intensities are left undivided.
pub fn read_businesses<R: Read>(reader: R) -> NetworkResult<Vec<Business>> {
    let mut seen: HashSet<u32> = HashSet::new();
    let mut out = Vec::new();
    for result in csv::Reader::from_reader(reader).deserialize::<BusinessRecord>() {
        let row = result?;
        if !seen.insert(row.business_id) {
            return Err(NetworkError::InvalidInput(format!(
                "duplicate business_id {}",
                row.business_id
            )));
        }
        out.push(Business::new(
            BusinessId(row.business_id),
            MapPoint::new(row.x, row.y),
            row.truck_int_raw,
        ));
    }
    Ok(out)
}

/// Read `bridges.csv` contents.  Bridge ids must be unique.
pub fn read_bridges<R: Read>(reader: R) -> NetworkResult<Vec<Bridge>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for result in csv::Reader::from_reader(reader).deserialize::<BridgeRecord>() {
        let row = result?;
        let id = row.bridge_id.trim().to_owned();
        if !seen.insert(id.clone()) {
            return Err(NetworkError::InvalidInput(format!("duplicate bridge_id {id:?}")));
        }
        out.push(Bridge::new(id, MapPoint::new(row.x, row.y)));
    }
    Ok(out)
}

/// Read `destinations.csv` contents, grouped by direction.
pub fn read_destinations<R: Read>(reader: R) -> NetworkResult<Vec<DestinationSet>> {
    let mut sets: Vec<DestinationSet> = Vec::new();
    let mut by_dir: HashMap<String, usize> = HashMap::new();
    for result in csv::Reader::from_reader(reader).deserialize::<DestinationRecord>() {
        let row = result?;
        let dir = row.direction.trim().to_owned();
        let slot = *by_dir.entry(dir.clone()).or_insert_with(|| {
            sets.push(DestinationSet::new(Direction::new(dir), Vec::new()));
            sets.len() - 1
        });
        sets[slot].points.push(MapPoint::new(row.x, row.y));
    }
    Ok(sets)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y"      => Some(true),
        "0" | "false" | "no" | "n" | "" => Some(false),
        _                               => None,
    }
}

fn parse_shape(s: &str) -> Option<Vec<MapPoint>> {
    s.split(';')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            let mut parts = v.split_whitespace();
            let x = parts.next()?.parse().ok()?;
            let y = parts.next()?.parse().ok()?;
            if parts.next().is_some() {
                return None;
            }
            Some(MapPoint::new(x, y))
        })
        .collect()
}
