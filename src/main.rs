use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::info;

use maitre::command::Command;
use maitre::engine::{SlotFilter, WidgetConfig};
use maitre::model::*;
use maitre::notify::Notice;
use maitre::session;
use maitre::source::{GuestDetails, StaticSource};

/// 12:00 UTC on the sample day, aligned to the slot grid.
const OPENING: Ts = 1_754_654_400;

/// A small floor: two rooms, a few tables, one splittable banquet table
/// offered as a bundle, and a dinner-rush stretch where most of the room
/// is already booked.
fn sample_day() -> RawDay {
    let slot_count = 43; // 12:00 .. 22:30
    let at = |step: i64| OPENING + step * SLOT_STEP;

    let table = |id: u64, room_id: u64, seats: u32, min: u32, max: u32, busy: &[(i64, i64)]| {
        let time_slots = (0..slot_count)
            .map(|i| RawSlot {
                timestamp: at(i),
                is_free: !busy.iter().any(|&(from, to)| (from..=to).contains(&i)),
                time: Some(time_label(at(i), 0)),
            })
            .collect();
        RawTable {
            id: TableId(id),
            room_id,
            number: Some(id.to_string()),
            shape: Some((if seats > 4 { "square" } else { "round" }).into()),
            capacity: seats,
            min_capacity: min,
            max_capacity: max,
            price: None,
            design_id: None,
            time_slots,
        }
    };

    RawDay {
        tables: Some(vec![
            // window seats, free all day
            table(1, 1, 2, 1, 2, &[]),
            table(2, 1, 2, 1, 2, &[(8, 20)]),
            // main room
            table(3, 1, 4, 2, 4, &[(24, 36)]), // booked through the evening
            table(4, 1, 4, 2, 4, &[]),
            table(5, 2, 6, 4, 6, &[(0, 4)]),
            // banquet halves, bookable only together
            table(10, 2, 6, 5, 8, &[]),
            table(11, 2, 6, 5, 8, &[]),
            // decorative fixture, never bookable
            table(99, 2, 0, 0, 0, &[]),
        ]),
        slots: vec![RawWindow {
            start_stamp: at(0),
            end_stamp: at(slot_count - 1),
            is_free: true,
            tables_ids: vec![],
            table_bundles: vec![vec![TableId(10), TableId(11)]],
        }],
        rooms: vec![
            RawRoom { id: 1, name: Some("Main hall".into()), floor: Some(1) },
            RawRoom { id: 2, name: Some("Terrace".into()), floor: Some(2) },
        ],
    }
}

async fn wait_for<T>(
    rx: &mut broadcast::Receiver<Notice>,
    mut pick: impl FnMut(&Notice) -> Option<T>,
) -> Option<T> {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Ok(notice)) => {
                tracing::debug!(?notice, "notice");
                if let Some(v) = pick(&notice) {
                    return Some(v);
                }
            }
            _ => return None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("MAITRE_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    maitre::observability::init(metrics_port);

    let date = std::env::var("MAITRE_DATE").unwrap_or_else(|_| "2026-08-08".into());
    let party_size: u32 = std::env::var("MAITRE_GUESTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(2);
    let latency_ms: u64 = std::env::var("MAITRE_LATENCY_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(50);

    let config = WidgetConfig {
        slot_filter: SlotFilter {
            earliest_minute: Some(12 * 60),
            latest_minute: Some(22 * 60 + 30),
            half_hour_only: true,
            not_before: None,
        },
        ..WidgetConfig::default()
    };

    info!(%date, party_size, "maitre demo starting");
    let source = Arc::new(
        StaticSource::new(sample_day()).with_delay(Duration::from_millis(latency_ms)),
    );
    let handle = session::spawn(source, config, date, party_size);
    let mut rx = handle.subscribe();

    // initial availability lands from the startup query
    let slots = wait_for(&mut rx, |n| match n {
        Notice::AvailabilityChanged(summary) => Some(summary.slots.clone()),
        _ => None,
    })
    .await
    .ok_or("no availability")?;
    let open: Vec<&SlotSummary> = slots.iter().filter(|s| s.available).collect();
    info!(
        total = slots.len(),
        open = open.len(),
        first = open.first().map(|s| s.time.as_str()),
        "time slots"
    );

    // book the 19:00 slot if it is open, otherwise the first open one
    let slot = open
        .iter()
        .find(|s| s.time == "19:00")
        .or(open.first())
        .ok_or("no open slots")?;
    info!(time = %slot.time, "choosing start time");
    handle.send(Command::TimeChosen { timestamp: Some(slot.timestamp) }).await;

    let busy = wait_for(&mut rx, |n| match n {
        Notice::BusyTablesChanged(busy) => Some(busy.clone()),
        _ => None,
    })
    .await
    .ok_or("no busy set")?;
    info!(?busy, "busy tables at the chosen time");

    let pick = sample_day()
        .tables
        .unwrap()
        .iter()
        .map(|t| t.id)
        .find(|id| !busy.contains(id) && id.0 != 99)
        .ok_or("every table is busy")?;
    info!(table = %pick, "toggling table");
    handle.send(Command::TableToggled { table: pick }).await;

    let selection = wait_for(&mut rx, |n| match n {
        Notice::SelectionChanged(s) => Some(s.clone()),
        _ => None,
    })
    .await
    .flatten()
    .ok_or("selection did not stick")?;
    info!(payload = %selection.payload, seats = selection.seat_total, "selection");

    handle
        .send(Command::SubmitRequested {
            guest: GuestDetails {
                name: "Ada".into(),
                phone: "+7 (000) 000-00-00".into(),
                comment: Some("window if possible".into()),
            },
        })
        .await;

    let reservation_id = wait_for(&mut rx, |n| match n {
        Notice::ReservationConfirmed { reservation_id } => Some(reservation_id.clone()),
        Notice::SubmitFailed { message } => {
            tracing::error!(message, "submit failed");
            Some(None)
        }
        _ => None,
    })
    .await
    .flatten();
    info!(?reservation_id, "done");

    Ok(())
}
