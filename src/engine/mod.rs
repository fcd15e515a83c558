mod bundles;
mod error;
mod matrix;
mod selection;
mod window;

pub use bundles::BundleMap;
pub use error::{BuildError, RejectReason};
pub use matrix::{AvailabilityMatrix, DaySnapshot, build_day};
pub use selection::{Selection, SelectionPolicy};
pub use window::{SlotFilter, busy_tables, slot_summaries, window_is_free};

use std::collections::HashSet;

use crate::limits::*;
use crate::model::*;
use crate::source::SourceError;

/// Widget-level configuration, fixed for the lifetime of one engine.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// Reservation duration in slot-grid steps (12 = 3 hours).
    pub duration_steps: u32,
    /// Hard cap on selectable tables.
    pub max_tables: Option<usize>,
    /// Each selected table seats exactly one guest.
    pub one_guest_one_table: bool,
    /// Upper bound on the party size in one-guest-one-table mode.
    pub party_ceiling: u32,
    /// Permit submitting without a table selection (the venue seats the
    /// party itself).
    pub allow_unseated: bool,
    /// Drop the whole selection whenever the start time changes.
    pub reset_selection_on_time_change: bool,
    /// Restaurant wall-clock offset for derived slot labels.
    pub utc_offset_secs: i32,
    pub slot_filter: SlotFilter,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            duration_steps: 12,
            max_tables: None,
            one_guest_one_table: false,
            party_ceiling: 20,
            allow_unseated: false,
            reset_selection_on_time_change: false,
            utc_offset_secs: 0,
            slot_filter: SlotFilter::default(),
        }
    }
}

/// Verdict on a completed availability fetch.
#[derive(Debug)]
pub enum Applied {
    /// The response carried the current sequence stamp and was applied.
    Current(ApplyReport),
    /// A newer query was issued before this response completed; its
    /// effects are discarded without touching state.
    Stale,
}

/// What a current response did to the engine.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Present when the matrix was rebuilt (also on degrade-to-empty).
    /// Transport failures preserve the last known-good matrix and carry
    /// no summary.
    pub summary: Option<AvailabilitySummary>,
    /// Previously selected tables that conflict with the fresh data; the
    /// selection has been cleared.
    pub invalidated: Vec<TableId>,
    /// The chosen start time vanished from the fresh slot set.
    pub time_dropped: bool,
    pub failure: Option<SourceError>,
}

/// Outcome of an accepted table toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Selected(Vec<TableId>),
    Deselected(Vec<TableId>),
}

/// Effects of changing the chosen start time.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TimeChange {
    /// Selected tables that conflict at the new time (removed, to be
    /// surfaced as `NoLongerAvailable`).
    pub invalidated: Vec<TableId>,
    /// The selection was dropped wholesale (policy reset, or a
    /// bundle-derived selection outliving its slot).
    pub selection_cleared: bool,
}

/// Effects of changing the party size.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PartyChange {
    pub party_size: u32,
    /// Selected tables whose capacity bounds exclude the new size.
    pub pruned: Vec<TableId>,
}

/// The availability/selection state container.
///
/// Owns the matrix, the selection, the chosen time, and the query sequence
/// counter; everything outside mutates it only through the operations
/// below. Purely synchronous — the session task wraps it and performs the
/// actual fetches.
pub struct TableEngine {
    config: WidgetConfig,
    date: String,
    party_size: u32,
    duration_steps: u32,
    chosen_time: Option<Ts>,
    snapshot: DaySnapshot,
    selection: Selection,
    /// Monotone query stamp; incremented on every triggering input,
    /// never reset.
    seq: u64,
}

impl TableEngine {
    pub fn new(config: WidgetConfig, date: impl Into<String>, party_size: u32) -> Self {
        let duration_steps = config.duration_steps.min(MAX_DURATION_STEPS);
        Self {
            config,
            date: date.into(),
            party_size: party_size.clamp(1, MAX_PARTY_SIZE),
            duration_steps,
            chosen_time: None,
            snapshot: DaySnapshot::empty(),
            selection: Selection::new(),
            seq: 0,
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn party_size(&self) -> u32 {
        self.party_size
    }

    pub fn duration_steps(&self) -> u32 {
        self.duration_steps
    }

    pub fn chosen_time(&self) -> Option<Ts> {
        self.chosen_time
    }

    pub fn matrix(&self) -> &AvailabilityMatrix {
        &self.snapshot.matrix
    }

    pub fn selection_summary(&self) -> Option<SelectionSummary> {
        self.selection.summary()
    }

    pub fn selected_ids(&self) -> Vec<TableId> {
        self.selection.ids()
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    fn policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            max_tables: self.config.max_tables,
            one_guest_one_table: self.config.one_guest_one_table,
        }
    }

    // ── Request sequencing ───────────────────────────────────────

    /// Stamp a new availability query. Must be called before issuing the
    /// fetch; the returned stamp travels with the response.
    pub fn begin_query(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Whether a stamp is still the freshest issued query.
    pub fn is_current(&self, stamp: u64) -> bool {
        stamp == self.seq
    }

    /// Feed a completed fetch back in. Staleness is judged against the
    /// counter's value *now* — a response stamped by an older query is
    /// discarded even if it arrives first.
    pub fn apply_response(
        &mut self,
        stamp: u64,
        outcome: Result<RawDay, SourceError>,
    ) -> Applied {
        if !self.is_current(stamp) {
            return Applied::Stale;
        }

        let mut report = ApplyReport::default();
        match outcome {
            Err(err @ SourceError::Transport(_)) => {
                // keep the last known-good matrix
                report.failure = Some(err);
                return Applied::Current(report);
            }
            Err(err @ SourceError::Unavailable) => {
                self.install_snapshot(DaySnapshot::empty(), &mut report);
                report.failure = Some(err);
            }
            Ok(raw) => match build_day(&raw) {
                Ok(snapshot) => self.install_snapshot(snapshot, &mut report),
                Err(_) => {
                    self.install_snapshot(DaySnapshot::empty(), &mut report);
                    report.failure = Some(SourceError::Unavailable);
                }
            },
        }
        Applied::Current(report)
    }

    fn install_snapshot(&mut self, snapshot: DaySnapshot, report: &mut ApplyReport) {
        self.snapshot = snapshot;

        let summary = self.availability_summary();
        if let Some(ts) = self.chosen_time
            && !summary.slots.iter().any(|s| s.timestamp == ts)
        {
            self.chosen_time = None;
            report.time_dropped = true;
        }

        // A table that was free when chosen must never stay selected once
        // it is known to conflict.
        let busy = self.busy_set();
        let conflicting: Vec<TableId> = self
            .selection
            .ids()
            .into_iter()
            .filter(|&id| !self.snapshot.matrix.contains_table(id) || busy.contains(&id))
            .collect();
        if !conflicting.is_empty() {
            self.selection.clear();
            report.invalidated = conflicting;
        }

        report.summary = Some(summary);
    }

    // ── Input changes ────────────────────────────────────────────

    /// New reservation date. Clears the chosen time and the selection;
    /// the caller issues a fresh query.
    pub fn set_date(&mut self, date: impl Into<String>) -> bool {
        self.date = date.into();
        self.chosen_time = None;
        self.selection.clear()
    }

    /// New party size. Selected tables whose bounds exclude the new size
    /// are dropped immediately; the follow-up query's invalidation pass
    /// handles the rest. Bundle selections qualify by aggregate capacity
    /// and are left to that pass.
    pub fn set_party_size(&mut self, party_size: u32) -> PartyChange {
        self.party_size = party_size.clamp(1, MAX_PARTY_SIZE);
        let mut change = PartyChange { party_size: self.party_size, ..Default::default() };

        if !self.selection.is_bundle() {
            let matrix = &self.snapshot.matrix;
            let size = self.party_size;
            change.pruned = self
                .selection
                .prune(|id| matrix.table(id).is_some_and(|t| t.fits(size)));
        }
        change
    }

    /// New reservation duration, in slot-grid steps. Invalidates the
    /// current choices.
    pub fn set_duration(&mut self, steps: u32) -> bool {
        self.duration_steps = steps.min(MAX_DURATION_STEPS);
        self.selection.clear()
    }

    /// Choose (or re-choose to clear) the start time. Re-derives the busy
    /// set there and evicts selected tables that conflict; a bundle-derived
    /// selection never survives a time change.
    pub fn choose_time(&mut self, ts: Option<Ts>) -> TimeChange {
        let mut change = TimeChange::default();

        // re-picking the chosen slot toggles it off
        self.chosen_time = if ts == self.chosen_time { None } else { ts };

        if self.config.reset_selection_on_time_change {
            change.selection_cleared = self.selection.clear();
            return change;
        }
        if self.selection.is_bundle() {
            change.selection_cleared = self.selection.clear();
            return change;
        }

        let busy = self.busy_set();
        let matrix = &self.snapshot.matrix;
        change.invalidated = self
            .selection
            .prune(|id| matrix.contains_table(id) && !busy.contains(&id));
        change.selection_cleared = !change.invalidated.is_empty() && self.selection.is_empty();
        change
    }

    // ── Selection operations ─────────────────────────────────────

    /// Toggle one table. Deselects if selected (bundle-mates included);
    /// otherwise resolves the bundle for the chosen time and either selects
    /// the whole bundle in place of any prior selection, or validates and
    /// adds the single table.
    pub fn toggle_table(&mut self, id: TableId) -> Result<ToggleOutcome, RejectReason> {
        if self.selection.contains(id) {
            let removed = self.selection.deselect(id);
            if self.config.one_guest_one_table && self.party_size > 1 {
                self.party_size -= 1;
            }
            return Ok(ToggleOutcome::Deselected(removed));
        }

        let table = self
            .snapshot
            .matrix
            .table(id)
            .ok_or_else(|| RejectReason::NoLongerAvailable { tables: vec![id] })?;
        let seats = table.seats;
        let fits = table.fits(self.party_size);

        if self.busy_set().contains(&id) {
            let exempt = self.snapshot.bundles.is_member(self.chosen_time, id);
            return Err(if !fits && !exempt {
                RejectReason::CapacityMismatch {
                    party_size: self.party_size,
                    seat_total: seats,
                }
            } else {
                RejectReason::NoLongerAvailable { tables: vec![id] }
            });
        }

        if let Some(bundle) = self.snapshot.bundles.resolve(self.chosen_time, id) {
            let members = bundle.to_vec();
            let mut seated = Vec::with_capacity(members.len());
            for member in &members {
                match self.snapshot.matrix.table(*member) {
                    Some(t) => seated.push((t.id, t.seats)),
                    None => {
                        return Err(RejectReason::NoLongerAvailable { tables: vec![*member] });
                    }
                }
            }
            self.selection.select_bundle(&seated);
            return Ok(ToggleOutcome::Selected(members));
        }

        // bundles are mutually exclusive with free-form selection
        if self.selection.is_bundle() {
            self.selection.clear();
        }

        let had_selection = !self.selection.is_empty();
        if self.config.one_guest_one_table
            && had_selection
            && self.party_size >= self.config.party_ceiling
        {
            return Err(RejectReason::LimitExceeded {
                limit: self.config.party_ceiling as usize,
            });
        }

        let policy = self.policy();
        let party_size = self.party_size;
        self.selection.try_add(id, seats, party_size, policy)?;
        if self.config.one_guest_one_table && had_selection {
            self.party_size += 1;
        }
        Ok(ToggleOutcome::Selected(vec![id]))
    }

    /// Unconditionally empty the selection.
    pub fn clear_selection(&mut self) -> bool {
        self.selection.clear()
    }

    /// Back to the blank widget: no selection, no chosen time. The matrix
    /// stays; the caller decides whether to re-query.
    pub fn reset(&mut self) {
        self.selection.clear();
        self.chosen_time = None;
    }

    // ── Derived views ────────────────────────────────────────────

    pub fn busy_set(&self) -> HashSet<TableId> {
        busy_tables(
            &self.snapshot.matrix,
            &self.snapshot.bundles,
            self.party_size,
            self.chosen_time,
            self.duration_steps,
        )
    }

    pub fn availability_summary(&self) -> AvailabilitySummary {
        AvailabilitySummary {
            date: self.date.clone(),
            party_size: self.party_size,
            slots: slot_summaries(
                &self.snapshot.matrix,
                self.party_size,
                self.duration_steps,
                &self.config.slot_filter,
                self.config.utc_offset_secs,
            ),
        }
    }
}
