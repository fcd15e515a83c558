use std::time::{Duration, Instant};

use maitre::engine::{self, SlotFilter, build_day};
use maitre::model::*;

/// 12:00 on the bench day, slot-grid aligned.
const NOON: Ts = 1_754_654_400;
const SLOTS_PER_DAY: i64 = 96;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

/// A plausible large venue: `n` tables, full-day slot grids, every third
/// table with a lunch booking and every fifth with a dinner booking.
fn synthetic_day(n: u64) -> RawDay {
    let tables = (1..=n)
        .map(|id| {
            let time_slots = (0..SLOTS_PER_DAY)
                .map(|i| {
                    let lunch = (8..16).contains(&i) && id % 3 == 0;
                    let dinner = (28..44).contains(&i) && id % 5 == 0;
                    RawSlot {
                        timestamp: NOON + i * SLOT_STEP,
                        is_free: !(lunch || dinner),
                        time: None,
                    }
                })
                .collect();
            RawTable {
                id: TableId(id),
                room_id: 1 + id % 4,
                number: Some(id.to_string()),
                shape: None,
                capacity: 2 + (id % 6) as u32,
                min_capacity: 1 + (id % 3) as u32,
                max_capacity: 2 + (id % 6) as u32,
                price: None,
                design_id: None,
                time_slots,
            }
        })
        .collect();

    RawDay { tables: Some(tables), slots: vec![], rooms: vec![] }
}

fn main() {
    const TABLES: u64 = 200;
    const ROUNDS: usize = 500;

    println!("maitre stress: {TABLES} tables x {SLOTS_PER_DAY} slots, {ROUNDS} rounds");

    let raw = synthetic_day(TABLES);

    let mut build = Vec::with_capacity(ROUNDS);
    for _ in 0..ROUNDS {
        let start = Instant::now();
        let snapshot = build_day(&raw).expect("synthetic day builds");
        build.push(start.elapsed());
        assert_eq!(snapshot.matrix.table_count(), TABLES as usize);
    }
    print_latency("build_day", &mut build);

    let snapshot = build_day(&raw).expect("synthetic day builds");
    let filter = SlotFilter::default();

    let mut summaries = Vec::with_capacity(ROUNDS);
    for round in 0..ROUNDS {
        let party_size = 1 + (round % 8) as u32;
        let start = Instant::now();
        let slots = engine::slot_summaries(&snapshot.matrix, party_size, 12, &filter, 0);
        summaries.push(start.elapsed());
        assert_eq!(slots.len(), SLOTS_PER_DAY as usize);
    }
    print_latency("slot_summaries (3h duration)", &mut summaries);

    let mut busy = Vec::with_capacity(ROUNDS);
    for round in 0..ROUNDS {
        let chosen = NOON + ((round as i64) % SLOTS_PER_DAY) * SLOT_STEP;
        let start = Instant::now();
        let set = engine::busy_tables(&snapshot.matrix, &snapshot.bundles, 4, Some(chosen), 12);
        busy.push(start.elapsed());
        assert!(set.len() <= TABLES as usize);
    }
    print_latency("busy_tables (chosen time)", &mut busy);
}
