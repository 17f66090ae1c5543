//! Command-line arguments and their merge into `AnalysisConfig`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use bd_core::{AnalysisConfig, Direction};

#[derive(Parser, Debug)]
#[command(name = "bridge-detour")]
#[command(about = "Detour impact of closing weight-restricted bridges")]
#[command(long_about = "Routes every business to its nearest border crossing per direction, \
finds the bridges on each route, and re-routes with each bridge closed.

Input directory layout:
  nodes.csv         node_id,x,y
  edges.csv         from,to,cost,source,source_oid,oneway[,shape]
  businesses.csv    business_id,x,y,truck_int_raw
  bridges.csv       bridge_id,x,y
  destinations.csv  direction,x,y

Finished directions are reloaded from the output directory on restart;
pass --fresh to recompute them.")]
#[command(version)]
pub struct Cli {
    /// Directory holding the input CSV files
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory for results (created if missing)
    #[arg(short, long)]
    pub output: PathBuf,

    /// JSON analysis configuration; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Bridge-to-road proximity tolerance in map units
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Distance-weighting cutoff constant
    #[arg(long)]
    pub cutoff: Option<f64>,

    /// Distance-weighting power constant
    #[arg(long)]
    pub power: Option<f64>,

    /// Also aggregate traversals per network segment
    #[arg(long)]
    pub segments: bool,

    /// Direction to process (repeatable; default: all)
    #[arg(long = "direction")]
    pub directions: Vec<String>,

    /// Source name businesses may snap onto (repeatable; default: all)
    #[arg(long = "snappable")]
    pub snappable: Vec<String>,

    /// Source name businesses may never snap onto (repeatable)
    #[arg(long = "restricted")]
    pub restricted: Vec<String>,

    /// Worker threads (default: all logical cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Store results in detours.db instead of CSV files
    #[arg(long)]
    pub sqlite: bool,

    /// Recompute directions that already have stored results
    #[arg(long)]
    pub fresh: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn analysis_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(t) = self.tolerance {
            config.proximity_tolerance = t;
        }
        if let Some(c) = self.cutoff {
            config.cutoff = c;
        }
        if let Some(p) = self.power {
            config.power = p;
        }
        if self.segments {
            config.calculate_network_segments = true;
        }
        if !self.directions.is_empty() {
            config.directions = self.directions.iter().map(Direction::new).collect();
        }
        if !self.snappable.is_empty() {
            config.snappable_sources = self.snappable.clone();
        }
        if !self.restricted.is_empty() {
            config.restricted_sources = self.restricted.clone();
        }
        if self.threads.is_some() {
            config.num_threads = self.threads;
        }

        config.validate()?;
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}
