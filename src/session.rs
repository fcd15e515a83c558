use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::engine::{Applied, RejectReason, TableEngine, WidgetConfig};
use crate::model::{RawDay, TableId};
use crate::notify::{Notice, NotifyHub};
use crate::observability;
use crate::source::{AvailabilitySource, GuestDetails, ReservationRequest, SourceError, SubmitStatus};

const COMMAND_BUFFER: usize = 64;
const FETCH_BUFFER: usize = 16;

/// Caller-side handle to a running session: feed commands in, hear
/// notices back. Dropping every handle ends the session task.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    notify: Arc<NotifyHub>,
}

impl SessionHandle {
    /// Enqueue a command. Returns false once the session is gone.
    pub async fn send(&self, cmd: Command) -> bool {
        self.commands.send(cmd).await.is_ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notify.subscribe()
    }
}

struct FetchDone {
    stamp: u64,
    elapsed: Duration,
    outcome: Result<RawDay, SourceError>,
}

/// Spawn the session task: one cooperative loop owning the engine,
/// processing user commands and fetch completions in isolation. The only
/// suspension points are the two network calls on the source.
pub fn spawn(
    source: Arc<dyn AvailabilitySource>,
    config: WidgetConfig,
    date: impl Into<String>,
    party_size: u32,
) -> SessionHandle {
    let notify = Arc::new(NotifyHub::new());
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let task = SessionTask {
        engine: TableEngine::new(config, date, party_size),
        source,
        notify: notify.clone(),
    };
    tokio::spawn(task.run(cmd_rx));
    SessionHandle { commands: cmd_tx, notify }
}

struct SessionTask {
    engine: TableEngine,
    source: Arc<dyn AvailabilitySource>,
    notify: Arc<NotifyHub>,
}

impl SessionTask {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let (done_tx, mut done_rx) = mpsc::channel::<FetchDone>(FETCH_BUFFER);

        // the widget queries as soon as it comes up
        self.issue_fetch(&done_tx);

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd, &done_tx).await,
                    None => break,
                },
                Some(done) = done_rx.recv() => self.handle_fetch_done(done),
            }
        }
        debug!("session task finished");
    }

    async fn handle_command(&mut self, cmd: Command, done_tx: &mpsc::Sender<FetchDone>) {
        metrics::counter!(
            observability::COMMANDS_TOTAL,
            "command" => observability::command_label(&cmd)
        )
        .increment(1);

        match cmd {
            Command::DateChanged { date } => {
                if self.engine.set_date(date) {
                    self.notify.send(Notice::SelectionChanged(None));
                }
                self.issue_fetch(done_tx);
            }
            Command::PartySizeChanged { party_size } => {
                let change = self.engine.set_party_size(party_size);
                if !change.pruned.is_empty() {
                    self.notify
                        .send(Notice::SelectionChanged(self.engine.selection_summary()));
                }
                // recompute blocks from the cached matrix right away, then
                // pull fresh data
                self.publish_busy();
                self.issue_fetch(done_tx);
            }
            Command::DurationChanged { steps } => {
                if self.engine.set_duration(steps) {
                    self.notify.send(Notice::SelectionChanged(None));
                }
                self.notify
                    .send(Notice::AvailabilityChanged(self.engine.availability_summary()));
                self.publish_busy();
            }
            Command::TimeChosen { timestamp } => {
                let change = self.engine.choose_time(timestamp);
                if !change.invalidated.is_empty() {
                    self.reject(RejectReason::NoLongerAvailable {
                        tables: change.invalidated,
                    });
                    self.notify
                        .send(Notice::SelectionChanged(self.engine.selection_summary()));
                } else if change.selection_cleared {
                    self.notify.send(Notice::SelectionChanged(None));
                }
                self.publish_busy();
            }
            Command::TableToggled { table } => match self.engine.toggle_table(table) {
                Ok(_) => {
                    self.notify
                        .send(Notice::SelectionChanged(self.engine.selection_summary()));
                }
                Err(reason) => self.reject(reason),
            },
            Command::SelectionCleared => {
                if self.engine.clear_selection() {
                    self.notify.send(Notice::SelectionChanged(None));
                }
            }
            Command::SubmitRequested { guest } => self.handle_submit(guest, done_tx).await,
            Command::WidgetReset => {
                self.engine.reset();
                self.notify.send(Notice::SelectionChanged(None));
                self.publish_busy();
            }
        }
    }

    /// Stamp and launch an availability query. The response re-enters the
    /// loop through `done_rx` and is judged against the counter then.
    fn issue_fetch(&mut self, done_tx: &mpsc::Sender<FetchDone>) {
        let stamp = self.engine.begin_query();
        let date = self.engine.date().to_string();
        let party_size = self.engine.party_size();
        let source = self.source.clone();
        let tx = done_tx.clone();

        debug!(stamp, %date, party_size, "availability query issued");
        metrics::gauge!(observability::FETCHES_IN_FLIGHT).increment(1.0);

        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = source.fetch_availability(&date, party_size).await;
            let _ = tx
                .send(FetchDone { stamp, elapsed: started.elapsed(), outcome })
                .await;
        });
    }

    fn handle_fetch_done(&mut self, done: FetchDone) {
        metrics::gauge!(observability::FETCHES_IN_FLIGHT).decrement(1.0);
        metrics::histogram!(observability::FETCH_DURATION_SECONDS)
            .record(done.elapsed.as_secs_f64());

        match self.engine.apply_response(done.stamp, done.outcome) {
            Applied::Stale => {
                metrics::counter!(observability::FETCHES_TOTAL, "status" => "stale")
                    .increment(1);
                debug!(stamp = done.stamp, "stale availability response discarded");
            }
            Applied::Current(report) => {
                let status = if report.failure.is_some() { "failed" } else { "applied" };
                metrics::counter!(observability::FETCHES_TOTAL, "status" => status)
                    .increment(1);

                if let Some(err) = &report.failure {
                    warn!(stamp = done.stamp, error = %err, "availability source failed");
                    self.notify.send(Notice::SourceFailed(err.clone()));
                }
                if !report.invalidated.is_empty() {
                    info!(
                        tables = ?report.invalidated,
                        "fresh availability invalidated the selection"
                    );
                    self.reject(RejectReason::NoLongerAvailable {
                        tables: report.invalidated,
                    });
                    self.notify.send(Notice::SelectionChanged(None));
                }
                if let Some(summary) = report.summary {
                    self.notify.send(Notice::AvailabilityChanged(summary));
                    self.publish_busy();
                }
            }
        }
    }

    async fn handle_submit(&mut self, guest: GuestDetails, done_tx: &mpsc::Sender<FetchDone>) {
        let Some(time) = self.engine.chosen_time() else {
            self.submit_failed("error", "no start time chosen");
            return;
        };
        let table_ids = self.engine.selected_ids();
        if table_ids.is_empty() && !self.engine.config().allow_unseated {
            self.submit_failed("error", "no tables selected");
            return;
        }

        let request = ReservationRequest {
            date: self.engine.date().to_string(),
            time,
            guests_count: self.engine.party_size(),
            table_ids,
            name: guest.name,
            phone: guest.phone,
            comment: guest.comment,
        };

        match self.source.submit_reservation(&request).await {
            Ok(receipt) => match receipt.status {
                SubmitStatus::Ok => {
                    metrics::counter!(observability::SUBMITS_TOTAL, "status" => "ok")
                        .increment(1);
                    info!(reservation_id = ?receipt.reservation_id, "reservation confirmed");
                    self.notify.send(Notice::ReservationConfirmed {
                        reservation_id: receipt.reservation_id,
                    });
                    self.engine.reset();
                    self.notify.send(Notice::SelectionChanged(None));
                    self.issue_fetch(done_tx);
                }
                SubmitStatus::Error => {
                    let message = receipt
                        .message
                        .unwrap_or_else(|| "reservation rejected".into());
                    self.submit_failed("error", &message);
                }
            },
            Err(err) => self.submit_failed("transport", &err.to_string()),
        }
    }

    fn submit_failed(&self, status: &'static str, message: &str) {
        metrics::counter!(observability::SUBMITS_TOTAL, "status" => status).increment(1);
        warn!(message, "reservation submit failed");
        self.notify.send(Notice::SubmitFailed { message: message.to_string() });
    }

    fn reject(&self, reason: RejectReason) {
        metrics::counter!(
            observability::SELECTION_REJECTIONS_TOTAL,
            "reason" => observability::reject_label(&reason)
        )
        .increment(1);
        self.notify.send(Notice::SelectionRejected(reason));
    }

    fn publish_busy(&self) {
        let mut busy: Vec<TableId> = self.engine.busy_set().into_iter().collect();
        busy.sort();
        self.notify.send(Notice::BusyTablesChanged(busy));
    }
}
