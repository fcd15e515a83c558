use tokio::sync::broadcast;

use crate::engine::RejectReason;
use crate::model::{AvailabilitySummary, SelectionSummary, TableId};
use crate::source::SourceError;

const CHANNEL_CAPACITY: usize = 256;

/// Everything the presentation layer ever hears from the core.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A current (non-stale) matrix rebuild; includes per-slot usability
    /// for the active party size and duration.
    AvailabilityChanged(AvailabilitySummary),
    /// The effectively-busy table set was re-derived (matrix rebuild, time
    /// choice, duration or party-size change). Sorted by id.
    BusyTablesChanged(Vec<TableId>),
    /// An accepted selection mutation; `None` means the selection is empty.
    SelectionChanged(Option<SelectionSummary>),
    /// A rejected mutation or a post-refresh invalidation.
    SelectionRejected(RejectReason),
    /// The provider failed; retry-eligible. The matrix was replaced with
    /// an empty one on `Unavailable` and preserved on `Transport`.
    SourceFailed(SourceError),
    ReservationConfirmed { reservation_id: Option<String> },
    SubmitFailed { message: String },
}

/// Broadcast hub between the session task and any number of observers.
pub struct NotifyHub {
    tx: broadcast::Sender<Notice>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self { tx: broadcast::channel(CHANNEL_CAPACITY).0 }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publish a notice. No-op if nobody is listening.
    pub fn send(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe();

        let notice = Notice::SelectionChanged(None);
        hub.send(notice.clone());

        let received = rx.recv().await.unwrap();
        assert_eq!(received, notice);
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        // No subscriber — should not panic
        hub.send(Notice::SubmitFailed { message: "x".into() });
    }
}
