use std::collections::HashSet;

use crate::model::*;

use super::bundles::BundleMap;
use super::matrix::AvailabilityMatrix;

/// Whether a table can host a reservation of `steps` slot-grid steps
/// starting at `start`.
///
/// The start instant must be explicitly reported free — unknown is never
/// offered. Later steps block only on an explicit `false`: the provider
/// may not report that far ahead, and absence never blocks. With
/// `steps == 0` this degenerates to the single-instant check.
pub fn window_is_free(matrix: &AvailabilityMatrix, id: TableId, start: Ts, steps: u32) -> bool {
    if matrix.is_free(start, id) != Some(true) {
        return false;
    }
    for i in 1..=steps as Ts {
        if matrix.is_free(start + i * SLOT_STEP, id) == Some(false) {
            return false;
        }
    }
    true
}

/// The effectively-busy table set for the current inputs: tables whose
/// capacity bounds exclude the party size, plus — once a start time is
/// chosen — tables failing the duration window there.
///
/// Members of a bundle active at the chosen slot skip the bounds check;
/// a bundle qualifies by aggregate capacity, not per-member bounds.
pub fn busy_tables(
    matrix: &AvailabilityMatrix,
    bundles: &BundleMap,
    party_size: u32,
    chosen: Option<Ts>,
    steps: u32,
) -> HashSet<TableId> {
    let mut busy = HashSet::new();
    for table in matrix.tables() {
        if !table.fits(party_size) && !bundles.is_member(chosen, table.id) {
            busy.insert(table.id);
            continue;
        }
        if let Some(start) = chosen
            && !window_is_free(matrix, table.id, start, steps)
        {
            busy.insert(table.id);
        }
    }
    busy
}

/// Slot summary policy: which provider slots are offered at all.
/// The default admits everything the provider sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotFilter {
    /// Earliest offered minute-of-day (inclusive).
    pub earliest_minute: Option<u32>,
    /// Latest offered minute-of-day (inclusive).
    pub latest_minute: Option<u32>,
    /// Offer only :00 / :30 starts.
    pub half_hour_only: bool,
    /// Absolute lead-time cutoff; slots before it are suppressed.
    pub not_before: Option<Ts>,
}

impl SlotFilter {
    fn admits(&self, ts: Ts, minute: u32) -> bool {
        if let Some(earliest) = self.earliest_minute
            && minute < earliest
        {
            return false;
        }
        if let Some(latest) = self.latest_minute
            && minute > latest
        {
            return false;
        }
        if self.half_hour_only && minute % 30 != 0 {
            return false;
        }
        if let Some(cutoff) = self.not_before
            && ts < cutoff
        {
            return false;
        }
        true
    }
}

fn label_minutes(label: &str) -> Option<u32> {
    let (h, m) = label.split_once(':')?;
    Some(h.parse::<u32>().ok()? * 60 + m.parse::<u32>().ok()?)
}

/// Per-slot any-usable summary for the active party size and duration.
///
/// A slot is available when at least one table is explicitly free at it,
/// admits the party size, and survives the duration window check.
pub fn slot_summaries(
    matrix: &AvailabilityMatrix,
    party_size: u32,
    steps: u32,
    filter: &SlotFilter,
    utc_offset_secs: i32,
) -> Vec<SlotSummary> {
    let timestamps: Vec<Ts> = matrix.timestamps().collect();
    let mut out = Vec::with_capacity(timestamps.len());

    for ts in timestamps {
        let time = matrix.label_for(ts, utc_offset_secs);
        let minute = label_minutes(&time).unwrap_or_else(|| minute_of_day(ts, utc_offset_secs));
        if !filter.admits(ts, minute) {
            continue;
        }

        let available = matrix.tables().any(|t| {
            t.fits(party_size) && window_is_free(matrix, t.id, ts, steps)
        });
        out.push(SlotSummary { timestamp: ts, time, available });
    }
    out
}
