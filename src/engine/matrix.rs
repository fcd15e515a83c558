use std::collections::{BTreeMap, HashMap};

use crate::limits::*;
use crate::model::*;

use super::bundles::BundleMap;
use super::error::BuildError;

// ── Availability Matrix ──────────────────────────────────────────

/// Timestamp-indexed free/busy lookup plus the table index derived from one
/// query response. Built once, immutable, superseded (not mutated) by the
/// next response's matrix.
///
/// Absence of a timestamp or table id is "unknown", never "free".
#[derive(Debug, Clone, Default)]
pub struct AvailabilityMatrix {
    slots: BTreeMap<Ts, HashMap<TableId, bool>>,
    tables: HashMap<TableId, Table>,
    labels: BTreeMap<Ts, String>,
}

impl AvailabilityMatrix {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Free/busy at a single instant. `None` = no data reported.
    pub fn is_free(&self, ts: Ts, id: TableId) -> Option<bool> {
        self.slots.get(&ts).and_then(|m| m.get(&id)).copied()
    }

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(&id)
    }

    pub fn contains_table(&self, id: TableId) -> bool {
        self.tables.contains_key(&id)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Slot-grid timestamps with data, ascending.
    pub fn timestamps(&self) -> impl Iterator<Item = Ts> + '_ {
        self.slots.keys().copied()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.tables.is_empty()
    }

    pub fn contains_timestamp(&self, ts: Ts) -> bool {
        self.slots.contains_key(&ts)
    }

    /// Provider "HH:MM" label for a slot, derived from the timestamp when
    /// the provider sent none.
    pub fn label_for(&self, ts: Ts, utc_offset_secs: i32) -> String {
        match self.labels.get(&ts) {
            Some(l) => l.clone(),
            None => time_label(ts, utc_offset_secs),
        }
    }

    /// Record one `(timestamp, table, is_free)` triple.
    ///
    /// Last write wins: duplicates must not occur in well-formed input, but
    /// the merge tolerates them silently — this is the documented contract,
    /// not an accident of insertion order.
    fn mark(&mut self, ts: Ts, id: TableId, is_free: bool) {
        self.slots.entry(ts).or_default().insert(id, is_free);
    }
}

/// Everything derived from one raw day response.
#[derive(Debug, Clone, Default)]
pub struct DaySnapshot {
    pub matrix: AvailabilityMatrix,
    pub bundles: BundleMap,
}

impl DaySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }
}

fn valid_ts(ts: Ts) -> bool {
    (MIN_VALID_TIMESTAMP..=MAX_VALID_TIMESTAMP).contains(&ts)
}

/// Build the matrix, table index, and time-scoped bundles from a raw
/// response. Pure: no I/O, no side effects beyond the returned snapshot.
///
/// Tables with zero/zero capacity bounds are decorative fixtures and never
/// enter the matrix. A response without a table list, or one over the
/// `limits` caps, is rejected; callers degrade that to an empty matrix and
/// a `DataUnavailable` notice.
pub fn build_day(raw: &RawDay) -> Result<DaySnapshot, BuildError> {
    let tables = raw.tables.as_ref().ok_or(BuildError::MissingTables)?;
    if tables.len() > MAX_TABLES_PER_DAY {
        return Err(BuildError::Oversized("tables"));
    }
    if raw.slots.len() > MAX_WINDOWS_PER_DAY {
        return Err(BuildError::Oversized("windows"));
    }

    let mut snapshot = DaySnapshot::empty();

    for t in tables {
        // min == 0 and max == 0 marks a non-bookable fixture
        if t.min_capacity == 0 && t.max_capacity == 0 {
            continue;
        }
        if t.time_slots.len() > MAX_SLOTS_PER_TABLE {
            return Err(BuildError::Oversized("time slots"));
        }

        snapshot.matrix.tables.insert(
            t.id,
            Table {
                id: t.id,
                room_id: t.room_id,
                label: t.number.clone().unwrap_or_else(|| t.id.to_string()),
                shape: t.shape.clone(),
                seats: t.capacity,
                min_capacity: t.min_capacity,
                max_capacity: t.max_capacity,
                price: t.price,
                design_id: t.design_id,
            },
        );

        for slot in &t.time_slots {
            if !valid_ts(slot.timestamp) {
                continue;
            }
            snapshot.matrix.mark(slot.timestamp, t.id, slot.is_free);
            if let Some(time) = &slot.time {
                snapshot
                    .matrix
                    .labels
                    .entry(slot.timestamp)
                    .or_insert_with(|| time.clone());
            }
        }
    }

    for window in &raw.slots {
        if !valid_ts(window.start_stamp) || !valid_ts(window.end_stamp) {
            continue;
        }
        let steps = (window.end_stamp - window.start_stamp) / SLOT_STEP;
        if !(0..=MAX_WINDOW_STEPS).contains(&steps) {
            continue;
        }

        // The window encoding covers both endpoints, hence inclusive.
        if window.is_free && !window.tables_ids.is_empty() {
            for i in 0..=steps {
                let ts = window.start_stamp + i * SLOT_STEP;
                for &id in &window.tables_ids {
                    snapshot.matrix.mark(ts, id, true);
                }
            }
        }

        for bundle in &window.table_bundles {
            if bundle.is_empty() || bundle.len() > MAX_BUNDLE_SIZE {
                continue;
            }
            for i in 0..=steps {
                let ts = window.start_stamp + i * SLOT_STEP;
                snapshot.bundles.add(ts, bundle.clone());
            }
        }
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_table(id: u64, min: u32, max: u32, slots: Vec<(Ts, bool)>) -> RawTable {
        RawTable {
            id: TableId(id),
            room_id: 1,
            number: Some(id.to_string()),
            shape: None,
            capacity: max,
            min_capacity: min,
            max_capacity: max,
            price: None,
            design_id: None,
            time_slots: slots
                .into_iter()
                .map(|(timestamp, is_free)| RawSlot { timestamp, is_free, time: None })
                .collect(),
        }
    }

    fn day_of(tables: Vec<RawTable>) -> RawDay {
        RawDay { tables: Some(tables), slots: vec![], rooms: vec![] }
    }

    const T0: Ts = 1_749_999_600;

    #[test]
    fn builds_per_table_flags() {
        let day = day_of(vec![
            raw_table(1, 2, 4, vec![(T0, true), (T0 + SLOT_STEP, false)]),
            raw_table(2, 1, 2, vec![(T0, false)]),
        ]);
        let snap = build_day(&day).unwrap();
        assert_eq!(snap.matrix.is_free(T0, TableId(1)), Some(true));
        assert_eq!(snap.matrix.is_free(T0 + SLOT_STEP, TableId(1)), Some(false));
        assert_eq!(snap.matrix.is_free(T0, TableId(2)), Some(false));
        assert_eq!(snap.matrix.is_free(T0 + SLOT_STEP, TableId(2)), None);
    }

    #[test]
    fn duplicate_triples_last_write_wins() {
        let mut t = raw_table(1, 2, 4, vec![(T0, false)]);
        t.time_slots.push(RawSlot { timestamp: T0, is_free: true, time: None });
        let snap = build_day(&day_of(vec![t])).unwrap();
        assert_eq!(snap.matrix.is_free(T0, TableId(1)), Some(true));
    }

    #[test]
    fn zero_zero_tables_excluded() {
        let day = day_of(vec![
            raw_table(1, 0, 0, vec![(T0, true)]),
            raw_table(2, 2, 4, vec![(T0, true)]),
        ]);
        let snap = build_day(&day).unwrap();
        assert!(!snap.matrix.contains_table(TableId(1)));
        assert!(snap.matrix.contains_table(TableId(2)));
        assert_eq!(snap.matrix.is_free(T0, TableId(1)), None);
    }

    #[test]
    fn missing_table_list_rejected() {
        let day = RawDay { tables: None, slots: vec![], rooms: vec![] };
        assert_eq!(build_day(&day).unwrap_err(), BuildError::MissingTables);
    }

    #[test]
    fn oversized_table_list_rejected() {
        let tables = (0..(MAX_TABLES_PER_DAY as u64 + 1))
            .map(|i| raw_table(i, 1, 2, vec![]))
            .collect();
        assert_eq!(build_day(&day_of(tables)).unwrap_err(), BuildError::Oversized("tables"));
    }

    #[test]
    fn free_window_marks_every_step() {
        let mut day = day_of(vec![raw_table(1, 2, 4, vec![])]);
        day.slots.push(RawWindow {
            start_stamp: T0,
            end_stamp: T0 + 2 * SLOT_STEP,
            is_free: true,
            tables_ids: vec![TableId(1)],
            table_bundles: vec![],
        });
        let snap = build_day(&day).unwrap();
        for i in 0..=2 {
            assert_eq!(snap.matrix.is_free(T0 + i * SLOT_STEP, TableId(1)), Some(true));
        }
        assert_eq!(snap.matrix.is_free(T0 + 3 * SLOT_STEP, TableId(1)), None);
    }

    #[test]
    fn busy_window_does_not_mark() {
        let mut day = day_of(vec![raw_table(1, 2, 4, vec![])]);
        day.slots.push(RawWindow {
            start_stamp: T0,
            end_stamp: T0 + SLOT_STEP,
            is_free: false,
            tables_ids: vec![TableId(1)],
            table_bundles: vec![],
        });
        let snap = build_day(&day).unwrap();
        assert_eq!(snap.matrix.is_free(T0, TableId(1)), None);
    }

    #[test]
    fn bundles_attached_to_each_window_step() {
        let mut day = day_of(vec![raw_table(1, 2, 4, vec![])]);
        day.slots.push(RawWindow {
            start_stamp: T0,
            end_stamp: T0 + SLOT_STEP,
            is_free: true,
            tables_ids: vec![],
            table_bundles: vec![vec![TableId(7), TableId(8)]],
        });
        let snap = build_day(&day).unwrap();
        assert_eq!(
            snap.bundles.resolve(Some(T0), TableId(7)),
            Some(&[TableId(7), TableId(8)][..])
        );
        assert_eq!(
            snap.bundles.resolve(Some(T0 + SLOT_STEP), TableId(8)),
            Some(&[TableId(7), TableId(8)][..])
        );
        assert_eq!(snap.bundles.resolve(Some(T0 + 2 * SLOT_STEP), TableId(7)), None);
    }

    #[test]
    fn out_of_range_timestamps_dropped() {
        let day = day_of(vec![raw_table(1, 2, 4, vec![(-5, true), (T0, true)])]);
        let snap = build_day(&day).unwrap();
        assert_eq!(snap.matrix.slot_count(), 1);
    }

    #[test]
    fn provider_label_preferred_derived_fallback() {
        let mut t = raw_table(1, 2, 4, vec![(T0, true)]);
        t.time_slots[0].time = Some("19:00".into());
        let snap = build_day(&day_of(vec![t])).unwrap();
        assert_eq!(snap.matrix.label_for(T0, 0), "19:00");
        // no label recorded for the next step — falls back to derivation
        assert_eq!(snap.matrix.label_for(T0 + SLOT_STEP, 0), time_label(T0 + SLOT_STEP, 0));
    }
}
