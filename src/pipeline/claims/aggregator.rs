//! Stage aggregator: merge extraction and decision units into one sequence.

use super::types::{PipelineUnit, Stage};

/// Extraction units first, in order, then every decision unit that carries
/// a signal. Decision units never keep a record.
pub fn aggregate_units(
    extraction: Vec<PipelineUnit>,
    decision: Vec<PipelineUnit>,
) -> Vec<PipelineUnit> {
    let mut units = extraction;
    let mut dropped = 0usize;

    for mut unit in decision {
        if !unit.has_signal() {
            dropped += 1;
            continue;
        }
        unit.stage = Stage::Decision;
        unit.record = None;
        units.push(unit);
    }

    if dropped > 0 {
        tracing::debug!(dropped, "Dropped empty decision units");
    }
    units
}
