use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::model::{RawDay, TableId, Ts};

/// Failure modes of the availability provider, as the core sees them.
///
/// `Unavailable` means the provider answered but carried no usable data —
/// the engine degrades to "no times available". `Transport` means the call
/// itself failed; the last known-good matrix is preserved. Adapters must
/// resolve (map timeouts into one of these) rather than hang.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    Unavailable,
    Transport(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Unavailable => write!(f, "no availability data"),
            SourceError::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Contact details travelling with a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Submission payload handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub date: String,
    pub time: Ts,
    pub guests_count: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_ids: Vec<TableId>,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitStatus {
    Ok,
    Error,
}

/// Provider's answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub status: SubmitStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,
}

/// The reservation provider, seen from the core.
///
/// Both calls are asynchronous, fallible, and must be idempotent-safe: the
/// sequencer may issue several availability queries before one resolves.
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    async fn fetch_availability(
        &self,
        date: &str,
        party_size: u32,
    ) -> Result<RawDay, SourceError>;

    async fn submit_reservation(
        &self,
        request: &ReservationRequest,
    ) -> Result<SubmitReceipt, SourceError>;
}

// ── In-process sources ───────────────────────────────────────────

/// Serves one canned day response for every query. Used by the demo binary
/// and anywhere a deterministic provider is enough.
pub struct StaticSource {
    day: RawDay,
    delay: Duration,
    submissions: AtomicU64,
}

impl StaticSource {
    pub fn new(day: RawDay) -> Self {
        Self { day, delay: Duration::ZERO, submissions: AtomicU64::new(0) }
    }

    /// Simulate network latency on every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl AvailabilitySource for StaticSource {
    async fn fetch_availability(&self, _date: &str, _party_size: u32) -> Result<RawDay, SourceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.day.clone())
    }

    async fn submit_reservation(
        &self,
        _request: &ReservationRequest,
    ) -> Result<SubmitReceipt, SourceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let n = self.submissions.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(SubmitReceipt {
            status: SubmitStatus::Ok,
            message: None,
            reservation_id: Some(format!("R-{n:04}")),
        })
    }
}

/// Plays back a queue of prepared responses, each after its own delay.
/// With `tokio::time::pause` this gives tests exact control over which of
/// several in-flight queries completes first.
pub struct ScriptedSource {
    fetches: Mutex<VecDeque<(Duration, Result<RawDay, SourceError>)>>,
    submits: Mutex<VecDeque<Result<SubmitReceipt, SourceError>>>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fetches: Mutex::new(VecDeque::new()),
            submits: Mutex::new(VecDeque::new()),
        })
    }

    pub async fn push_fetch(&self, delay: Duration, outcome: Result<RawDay, SourceError>) {
        self.fetches.lock().await.push_back((delay, outcome));
    }

    pub async fn push_submit(&self, outcome: Result<SubmitReceipt, SourceError>) {
        self.submits.lock().await.push_back(outcome);
    }
}

#[async_trait]
impl AvailabilitySource for ScriptedSource {
    async fn fetch_availability(&self, _date: &str, _party_size: u32) -> Result<RawDay, SourceError> {
        let next = self.fetches.lock().await.pop_front();
        match next {
            Some((delay, outcome)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                outcome
            }
            // an unscripted call hangs forever would violate the adapter
            // contract; resolve as a transport failure instead
            None => Err(SourceError::Transport("no scripted response".into())),
        }
    }

    async fn submit_reservation(
        &self,
        _request: &ReservationRequest,
    ) -> Result<SubmitReceipt, SourceError> {
        let next = self.submits.lock().await.pop_front();
        next.unwrap_or_else(|| Err(SourceError::Transport("no scripted response".into())))
    }
}
