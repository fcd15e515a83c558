use std::collections::BTreeMap;

use crate::model::{SelectionSummary, TableId};

use super::error::RejectReason;

/// Validation policy for non-bundle additions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionPolicy {
    /// Hard cap on selectable tables, when configured.
    pub max_tables: Option<usize>,
    /// "One guest per table" mode: party size tracks selection count and
    /// the capacity-accumulation policy is off.
    pub one_guest_one_table: bool,
}

/// The set of currently selected tables, each annotated with its seat
/// count at selection time. `Empty → SingleSelected → BundleSelected`,
/// reset and reused for every booking attempt.
#[derive(Debug, Clone)]
pub struct Selection {
    seats_by_table: BTreeMap<TableId, u32>,
    bundle: bool,
    /// Serialized id list for submission payloads — derived, recomputed
    /// after every accepted mutation, never independently mutated.
    payload: String,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}

impl Selection {
    pub fn new() -> Self {
        let mut s = Self {
            seats_by_table: BTreeMap::new(),
            bundle: false,
            payload: String::new(),
        };
        s.recompute_payload();
        s
    }

    pub fn is_empty(&self) -> bool {
        self.seats_by_table.is_empty()
    }

    pub fn len(&self) -> usize {
        self.seats_by_table.len()
    }

    pub fn contains(&self, id: TableId) -> bool {
        self.seats_by_table.contains_key(&id)
    }

    pub fn is_bundle(&self) -> bool {
        self.bundle
    }

    pub fn ids(&self) -> Vec<TableId> {
        self.seats_by_table.keys().copied().collect()
    }

    pub fn seat_total(&self) -> u32 {
        self.seats_by_table.values().sum()
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn summary(&self) -> Option<SelectionSummary> {
        if self.is_empty() {
            return None;
        }
        Some(SelectionSummary {
            tables: self.ids(),
            seat_total: self.seat_total(),
            is_bundle: self.bundle,
            payload: self.payload.clone(),
        })
    }

    /// Unconditionally empty the selection. Returns whether anything was
    /// selected.
    pub fn clear(&mut self) -> bool {
        let had = !self.is_empty();
        self.seats_by_table.clear();
        self.bundle = false;
        self.recompute_payload();
        had
    }

    /// Deselect one table. A bundle deselects as a whole: removing any
    /// member removes all of them. Returns the ids actually removed.
    pub fn deselect(&mut self, id: TableId) -> Vec<TableId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let removed = if self.bundle {
            let all = self.ids();
            self.seats_by_table.clear();
            self.bundle = false;
            all
        } else {
            self.seats_by_table.remove(&id);
            vec![id]
        };
        self.recompute_payload();
        removed
    }

    /// Validated non-bundle addition.
    ///
    /// Max-table policy wins over capacity accumulation; the accumulation
    /// check only applies when no table limit is configured and the widget
    /// is not in one-guest-per-table mode. Rejections leave the selection
    /// untouched.
    pub fn try_add(
        &mut self,
        id: TableId,
        seats: u32,
        party_size: u32,
        policy: SelectionPolicy,
    ) -> Result<(), RejectReason> {
        if let Some(limit) = policy.max_tables {
            if self.len() >= limit {
                return Err(RejectReason::LimitExceeded { limit });
            }
        } else if !policy.one_guest_one_table {
            let seat_total = self.seat_total();
            if seat_total > 0 && seat_total >= party_size {
                return Err(RejectReason::CapacityMismatch { party_size, seat_total });
            }
        }
        self.seats_by_table.insert(id, seats);
        self.bundle = false;
        self.recompute_payload();
        Ok(())
    }

    /// Select a bundle in place of any prior selection. Bundles are
    /// mutually exclusive with free-form multi-table selection.
    pub fn select_bundle(&mut self, members: &[(TableId, u32)]) {
        self.seats_by_table.clear();
        for &(id, seats) in members {
            self.seats_by_table.insert(id, seats);
        }
        self.bundle = true;
        self.recompute_payload();
    }

    /// Drop every selected table failing `keep`. If the selection is a
    /// bundle and any member falls, the whole bundle falls. Returns the
    /// removed ids.
    pub fn prune(&mut self, keep: impl Fn(TableId) -> bool) -> Vec<TableId> {
        let doomed: Vec<TableId> = self
            .seats_by_table
            .keys()
            .copied()
            .filter(|&id| !keep(id))
            .collect();
        if doomed.is_empty() {
            return doomed;
        }
        if self.bundle {
            let all = self.ids();
            self.seats_by_table.clear();
            self.bundle = false;
            self.recompute_payload();
            return all;
        }
        for id in &doomed {
            self.seats_by_table.remove(id);
        }
        self.recompute_payload();
        doomed
    }

    fn recompute_payload(&mut self) {
        let ids: Vec<TableId> = self.ids();
        self.payload = serde_json::to_string(&ids).expect("table id list serializes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FREE: SelectionPolicy = SelectionPolicy { max_tables: None, one_guest_one_table: false };

    #[test]
    fn add_and_deselect_single() {
        let mut s = Selection::new();
        s.try_add(TableId(1), 4, 6, FREE).unwrap();
        assert!(s.contains(TableId(1)));
        assert_eq!(s.payload(), "[1]");
        assert_eq!(s.deselect(TableId(1)), vec![TableId(1)]);
        assert!(s.is_empty());
        assert_eq!(s.payload(), "[]");
    }

    #[test]
    fn max_table_limit_preserves_state() {
        let policy = SelectionPolicy { max_tables: Some(1), ..FREE };
        let mut s = Selection::new();
        s.try_add(TableId(1), 4, 6, policy).unwrap();
        let err = s.try_add(TableId(2), 4, 6, policy).unwrap_err();
        assert_eq!(err, RejectReason::LimitExceeded { limit: 1 });
        assert_eq!(s.ids(), vec![TableId(1)]);
    }

    #[test]
    fn accumulation_rejects_once_party_is_covered() {
        let mut s = Selection::new();
        s.try_add(TableId(1), 3, 6, FREE).unwrap();
        s.try_add(TableId(2), 3, 6, FREE).unwrap();
        let err = s.try_add(TableId(3), 2, 6, FREE).unwrap_err();
        assert_eq!(err, RejectReason::CapacityMismatch { party_size: 6, seat_total: 6 });
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn accumulation_off_in_one_guest_mode() {
        let policy = SelectionPolicy { one_guest_one_table: true, ..FREE };
        let mut s = Selection::new();
        s.try_add(TableId(1), 4, 1, policy).unwrap();
        s.try_add(TableId(2), 4, 1, policy).unwrap();
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn bundle_is_atomic() {
        let mut s = Selection::new();
        s.select_bundle(&[(TableId(1), 2), (TableId(2), 2), (TableId(3), 2)]);
        assert!(s.is_bundle());
        assert_eq!(s.seat_total(), 6);
        let removed = s.deselect(TableId(2));
        assert_eq!(removed, vec![TableId(1), TableId(2), TableId(3)]);
        assert!(s.is_empty());
    }

    #[test]
    fn bundle_replaces_prior_selection() {
        let mut s = Selection::new();
        s.try_add(TableId(7), 4, 6, FREE).unwrap();
        s.select_bundle(&[(TableId(1), 2), (TableId(2), 2)]);
        assert!(!s.contains(TableId(7)));
        assert_eq!(s.payload(), "[1,2]");
    }

    #[test]
    fn prune_takes_whole_bundle() {
        let mut s = Selection::new();
        s.select_bundle(&[(TableId(1), 2), (TableId(2), 2)]);
        let removed = s.prune(|id| id != TableId(2));
        assert_eq!(removed, vec![TableId(1), TableId(2)]);
        assert!(s.is_empty());
    }

    #[test]
    fn prune_single_keeps_rest() {
        let mut s = Selection::new();
        s.try_add(TableId(1), 2, 8, FREE).unwrap();
        s.try_add(TableId(2), 2, 8, FREE).unwrap();
        let removed = s.prune(|id| id != TableId(1));
        assert_eq!(removed, vec![TableId(1)]);
        assert_eq!(s.ids(), vec![TableId(2)]);
        assert_eq!(s.payload(), "[2]");
    }

    #[test]
    fn summary_none_when_empty() {
        let mut s = Selection::new();
        assert!(s.summary().is_none());
        s.try_add(TableId(1), 4, 6, FREE).unwrap();
        let sum = s.summary().unwrap();
        assert_eq!(sum.tables, vec![TableId(1)]);
        assert_eq!(sum.seat_total, 4);
        assert!(!sum.is_bundle);
    }
}
