use crate::model::TableId;

/// Typed rejection of a selection mutation or a post-refresh invalidation.
/// Handed to the presentation layer; never corrupts existing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The configured maximum selectable-table count is already reached.
    LimitExceeded { limit: usize },
    /// Accumulated seats already cover the party, or the table's capacity
    /// bounds exclude the party size.
    CapacityMismatch { party_size: u32, seat_total: u32 },
    /// A fresher availability response (or a new start time) invalidated
    /// the table(s).
    NoLongerAvailable { tables: Vec<TableId> },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::LimitExceeded { limit } => {
                write!(f, "table limit reached: at most {limit} selectable")
            }
            RejectReason::CapacityMismatch { party_size, seat_total } => {
                write!(
                    f,
                    "capacity mismatch: party of {party_size} vs {seat_total} seats"
                )
            }
            RejectReason::NoLongerAvailable { tables } => {
                write!(f, "no longer available:")?;
                for t in tables {
                    write!(f, " {t}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for RejectReason {}

/// Why a raw day response could not be turned into a matrix.
/// Callers degrade any of these to "no times available" — an empty matrix,
/// never a retry storm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    MissingTables,
    Oversized(&'static str),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::MissingTables => write!(f, "response carries no table list"),
            BuildError::Oversized(what) => write!(f, "response over limit: {what}"),
        }
    }
}

impl std::error::Error for BuildError {}
