use std::hint::black_box;

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use slot_engine::{BusyInterval, ScheduleRequest, SlotEngine, WorkItem};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

/// A week of calendar with three meetings a day and `items` work items
/// spread over the week, every third one carrying a hint.
fn request(items: u32) -> ScheduleRequest {
    let mut request = ScheduleRequest::new(base());
    for day in 0..7 {
        for hour in [10, 13, 16] {
            let start = base() + Duration::days(day) + Duration::hours(hour - 8);
            request
                .busy
                .push(BusyInterval::new(start, start + Duration::minutes(45)).unwrap());
        }
    }
    const HINTS: [&str; 3] = ["tomorrow afternoon", "friday morning", "thursday evening"];
    request.items = (0..items)
        .map(|sequence| WorkItem {
            sequence,
            estimated_minutes: 30 + (sequence % 4) * 30,
            raw_time_hint: (sequence % 3 == 0)
                .then(|| HINTS[(sequence as usize / 3) % HINTS.len()].to_string()),
            deadline: base() + Duration::days(1 + i64::from(sequence % 7)) + Duration::hours(13),
        })
        .collect();
    request
}

fn bench_schedule(c: &mut Criterion) {
    let engine = SlotEngine::default();
    let mut group = c.benchmark_group("schedule");
    for items in [5u32, 20, 60] {
        let req = request(items);
        group.bench_with_input(BenchmarkId::from_parameter(items), &req, |b, req| {
            b.iter(|| engine.schedule(black_box(req)).unwrap())
        });
    }
    group.finish();
}

fn bench_free_windows(c: &mut Criterion) {
    let engine = SlotEngine::default();
    let req = request(20);
    c.bench_function("free_windows_week", |b| {
        b.iter(|| engine.free_windows(black_box(&req)).unwrap())
    });
}

criterion_group!(benches, bench_schedule, bench_free_windows);
criterion_main!(benches);
