use std::collections::HashMap;

use crate::model::{Bundle, TableId, Ts};

/// Time-scoped bundle index: bundles may differ by day and time, so
/// membership is re-derived from every query response and keyed by slot
/// timestamp — never cached across queries.
#[derive(Debug, Clone, Default)]
pub struct BundleMap {
    by_slot: HashMap<Ts, Vec<Bundle>>,
}

impl BundleMap {
    pub fn add(&mut self, ts: Ts, bundle: Bundle) {
        self.by_slot.entry(ts).or_default().push(bundle);
    }

    pub fn is_empty(&self) -> bool {
        self.by_slot.is_empty()
    }

    /// Bundles active at the given slot timestamp.
    pub fn bundles_at(&self, ts: Ts) -> &[Bundle] {
        self.by_slot.get(&ts).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The mandatory co-selection group containing `id` at the chosen start
    /// time. Without a chosen time every table resolves to none — that is
    /// single-table selection mode.
    pub fn resolve(&self, chosen: Option<Ts>, id: TableId) -> Option<&[TableId]> {
        let ts = chosen?;
        self.bundles_at(ts)
            .iter()
            .find(|b| b.contains(&id))
            .map(Vec::as_slice)
    }

    /// Whether `id` belongs to any bundle active at the chosen time.
    pub fn is_member(&self, chosen: Option<Ts>, id: TableId) -> bool {
        self.resolve(chosen, id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: Ts = 1_749_999_600;

    fn map() -> BundleMap {
        let mut m = BundleMap::default();
        m.add(T0, vec![TableId(1), TableId(2), TableId(3)]);
        m.add(T0, vec![TableId(8), TableId(9)]);
        m
    }

    #[test]
    fn resolves_containing_bundle() {
        let m = map();
        assert_eq!(
            m.resolve(Some(T0), TableId(2)),
            Some(&[TableId(1), TableId(2), TableId(3)][..])
        );
        assert_eq!(m.resolve(Some(T0), TableId(9)), Some(&[TableId(8), TableId(9)][..]));
        assert_eq!(m.resolve(Some(T0), TableId(4)), None);
    }

    #[test]
    fn no_chosen_time_means_no_bundles() {
        let m = map();
        assert_eq!(m.resolve(None, TableId(1)), None);
        assert!(!m.is_member(None, TableId(1)));
    }

    #[test]
    fn other_timestamps_resolve_nothing() {
        let m = map();
        assert_eq!(m.resolve(Some(T0 + 900), TableId(1)), None);
    }
}
