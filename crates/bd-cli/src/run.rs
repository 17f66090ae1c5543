//! The per-direction loop: reuse stored results or run and store them.

use anyhow::Result;
use log::{info, warn};

use bd_core::{DestinationSet, Direction};
use bd_detour::{DetourEngine, DetourRecord, Origin, ProgressObserver, SegmentTally};
use bd_network::Solver;
use bd_output::ResultSink;

/// What every direction contributed, in direction order.
#[derive(Debug, Default)]
pub struct DirectionResults {
    pub records: Vec<DetourRecord>,
    /// One tally per direction; empty unless segments are aggregated.
    pub tallies: Vec<(Direction, SegmentTally)>,
    /// Directions taken from the sink instead of being recomputed.
    pub reused:  Vec<Direction>,
}

/// Process each set in order.
///
/// Unless `fresh` is set, a direction the sink already holds is reloaded
/// rather than solved; with `segments` its tally is rebuilt from a
/// baseline-only pass.  Newly solved directions are written before the next
/// one starts, so an interrupted run loses at most one direction.
pub fn run_directions<S: Solver>(
    engine:   &DetourEngine<'_, S>,
    sets:     &[DestinationSet],
    origins:  &[Origin],
    sink:     &mut dyn ResultSink,
    fresh:    bool,
    segments: bool,
    progress: &dyn ProgressObserver,
) -> Result<DirectionResults> {
    let mut out = DirectionResults::default();

    for set in sets {
        let direction = &set.direction;

        let stored = if fresh { None } else { sink.load_direction(direction)? };
        if let Some(stored) = stored {
            info!("{direction}: reusing {} stored records", stored.len());
            if segments {
                out.tallies.push((direction.clone(), engine.trace_segments(set, origins)?));
            }
            out.records.extend(stored);
            out.reused.push(direction.clone());
            continue;
        }

        let run = engine.run_direction(set, origins, progress)?;
        sink.write_detour_records(direction, &run.records)?;
        info!(
            "{direction}: {} businesses, {} crossing a bridge, {} records ({} cut off, {} unknown)",
            run.stats.businesses,
            run.stats.crossing_businesses,
            run.stats.records,
            run.stats.cut_off,
            run.stats.unknown
        );
        if run.stats.unreachable_baselines > 0 || run.stats.baseline_errors > 0 {
            warn!(
                "{direction}: {} businesses cannot reach a destination, {} failed to route",
                run.stats.unreachable_baselines, run.stats.baseline_errors
            );
        }
        if let Some(tally) = run.segments {
            out.tallies.push((direction.clone(), tally));
        }
        out.records.extend(run.records);
    }
    Ok(out)
}
