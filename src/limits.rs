//! Hard caps on provider input and user-tunable settings.
//!
//! The availability feed is untrusted remote data; anything over these caps
//! is treated as malformed and degrades to "no times available".

/// Max tables in one day response.
pub const MAX_TABLES_PER_DAY: usize = 4096;

/// Max time slots reported for a single table (one day at 15-minute grid is 96).
pub const MAX_SLOTS_PER_TABLE: usize = 2048;

/// Max free/busy windows in one day response.
pub const MAX_WINDOWS_PER_DAY: usize = 4096;

/// Max tables in one bundle.
pub const MAX_BUNDLE_SIZE: usize = 64;

/// Max slot-grid steps a single window may span.
pub const MAX_WINDOW_STEPS: i64 = 2048;

/// Party sizes above this are rejected at the command layer.
pub const MAX_PARTY_SIZE: u32 = 1000;

/// Max reservation duration, in slot-grid steps (two full days).
pub const MAX_DURATION_STEPS: u32 = 192;

/// Timestamps outside this range are dropped (sanity window, Unix seconds).
pub const MIN_VALID_TIMESTAMP: i64 = 0;
pub const MAX_VALID_TIMESTAMP: i64 = 4_102_444_800; // 2100-01-01
