use serde::{Deserialize, Serialize};

/// Unix seconds — the only time type.
pub type Ts = i64;

/// The provider reports free/busy state on a fixed 15-minute grid.
pub const SLOT_STEP: Ts = 900;

/// Provider-assigned table identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(pub u64);

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Provider wire format ─────────────────────────────────────────

/// One free/busy flag on the slot grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSlot {
    pub timestamp: Ts,
    pub is_free: bool,
    /// "HH:MM" label as the provider renders it; derived locally when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// One table as reported for a single day's query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub id: TableId,
    #[serde(default)]
    pub room_id: u64,
    /// Human-facing table number.
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub shape: Option<String>,
    /// Seats drawn on the floor plan; what the selection policy accumulates.
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub min_capacity: u32,
    #[serde(default)]
    pub max_capacity: u32,
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default)]
    pub design_id: Option<u64>,
    #[serde(default)]
    pub time_slots: Vec<RawSlot>,
}

/// A contiguous free/busy window — the provider's second encoding of
/// availability, spanning whole slot-grid ranges and carrying the
/// time-scoped table bundles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawWindow {
    pub start_stamp: Ts,
    pub end_stamp: Ts,
    pub is_free: bool,
    #[serde(default)]
    pub tables_ids: Vec<TableId>,
    #[serde(default)]
    pub table_bundles: Vec<Vec<TableId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRoom {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub floor: Option<u32>,
}

/// Full response to one availability query (date + party size).
///
/// `tables` is optional on the wire: a response without it is malformed and
/// the matrix builder degrades it to "no times available".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDay {
    #[serde(default)]
    pub tables: Option<Vec<RawTable>>,
    #[serde(default)]
    pub slots: Vec<RawWindow>,
    #[serde(default)]
    pub rooms: Vec<RawRoom>,
}

// ── Domain types ─────────────────────────────────────────────────

/// Table metadata, immutable for the lifetime of one availability query.
/// Replaced wholesale on each new query response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub id: TableId,
    pub room_id: u64,
    pub label: String,
    pub shape: Option<String>,
    /// Seat count accumulated by the capacity policy.
    pub seats: u32,
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub price: Option<u64>,
    pub design_id: Option<u64>,
}

impl Table {
    /// Whether this table's capacity bounds admit the given party size.
    /// A zero upper bound means the provider reported no upper bound.
    pub fn fits(&self, party_size: u32) -> bool {
        self.min_capacity <= party_size
            && (self.max_capacity == 0 || party_size <= self.max_capacity)
    }
}

/// A set of tables that must be booked together for a given time slot.
pub type Bundle = Vec<TableId>;

/// Per-slot entry of the availability summary handed to the presentation
/// layer: is there any usable table at this start time for the active
/// party size and duration?
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSummary {
    pub timestamp: Ts,
    pub time: String,
    pub available: bool,
}

/// Summary published after every current (non-stale) matrix rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilitySummary {
    pub date: String,
    pub party_size: u32,
    pub slots: Vec<SlotSummary>,
}

/// Summary published after every accepted selection mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSummary {
    pub tables: Vec<TableId>,
    pub seat_total: u32,
    pub is_bundle: bool,
    /// JSON array of table ids, ready for the submission payload.
    pub payload: String,
}

/// Derive an "HH:MM" label from a slot timestamp.
///
/// `utc_offset_secs` shifts into the restaurant's wall clock; the provider
/// label is preferred wherever it exists, this is the fallback.
pub fn time_label(ts: Ts, utc_offset_secs: i32) -> String {
    let local = ts + utc_offset_secs as Ts;
    let secs_of_day = local.rem_euclid(86_400);
    format!("{:02}:{:02}", secs_of_day / 3600, (secs_of_day % 3600) / 60)
}

/// Minute-of-day for a slot timestamp under the given offset.
pub fn minute_of_day(ts: Ts, utc_offset_secs: i32) -> u32 {
    let local = ts + utc_offset_secs as Ts;
    (local.rem_euclid(86_400) / 60) as u32
}
