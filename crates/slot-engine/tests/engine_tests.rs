//! Tests for the engine entry point: configuration, recorded items, horizons.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use slot_engine::{
    Due, EngineConfig, EngineError, ItemRecord, ScheduleEntry, ScheduleRequest, SlotEngine,
};

// 2026-03-02 is a Monday.
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

fn tokyo_engine() -> SlotEngine {
    SlotEngine::new(EngineConfig {
        timezone: "Asia/Tokyo".to_string(),
        ..EngineConfig::default()
    })
    .unwrap()
}

fn record(sequence: u32, hours: Option<f64>, due: Due) -> ItemRecord {
    ItemRecord {
        sequence,
        estimated_hours: hours,
        raw_time_hint: None,
        due,
    }
}

#[test]
fn engine_exposes_its_configuration() {
    let engine = tokyo_engine();
    assert_eq!(engine.timezone(), &chrono_tz::Asia::Tokyo);
    assert_eq!(engine.config().timezone, "Asia/Tokyo");
    assert_eq!(engine.config().buffer_minutes, 30);
}

#[test]
fn oversized_buffer_rejected_before_scheduling() {
    let err = SlotEngine::new(EngineConfig {
        buffer_minutes: 140_000_000_000_000,
        ..EngineConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPolicy(_)));

    let err = SlotEngine::new(EngineConfig {
        min_slot_minutes: i64::MAX,
        ..EngineConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPolicy(_)));
}

// ── Recorded items ──────────────────────────────────────────────────────────

#[test]
fn record_estimates_are_normalised() {
    let engine = SlotEngine::default();
    let due = Due::At(now() + Duration::days(2));
    let mut request = ScheduleRequest::new(now());
    request.records = vec![
        record(1, None, due),
        record(2, Some(1.5), due),
        record(3, Some(0.1), due),
        record(4, Some(20.0), due),
    ];

    let minutes: Vec<u32> = engine
        .work_items(&request)
        .unwrap()
        .iter()
        .map(|item| item.estimated_minutes)
        .collect();
    assert_eq!(minutes, vec![120, 90, 30, 360]);
}

#[test]
fn date_only_due_is_end_of_local_day() {
    let engine = tokyo_engine();
    let mut request = ScheduleRequest::new(now());
    request.records = vec![record(
        1,
        Some(1.5),
        Due::Date(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()),
    )];

    let items = engine.work_items(&request).unwrap();
    // 23:59 JST is 14:59 UTC.
    assert_eq!(
        items[0].deadline,
        Utc.with_ymd_and_hms(2026, 3, 2, 14, 59, 0).unwrap()
    );

    // 08:00 UTC is 17:00 JST, inside the Tokyo working day.
    let schedule = engine.schedule(&request).unwrap();
    match &schedule.entries[0] {
        ScheduleEntry::Placed(p) => {
            assert_eq!(p.start, now());
            assert_eq!(p.end, now() + Duration::minutes(90));
        }
        other => panic!("expected a placement, got {other:?}"),
    }
}

#[test]
fn records_deserialize_from_json() {
    let json = r#"{
        "now": "2026-03-02T08:00:00Z",
        "records": [
            { "sequence": 1, "due": "2026-03-03" },
            { "sequence": 2, "estimated_hours": 1, "due": "2026-03-03T12:00:00Z" }
        ]
    }"#;
    let request: ScheduleRequest = serde_json::from_str(json).unwrap();
    assert_eq!(
        request.records[0].due,
        Due::Date(NaiveDate::from_ymd_opt(2026, 3, 3).unwrap())
    );
    assert_eq!(
        request.records[1].due,
        Due::At(Utc.with_ymd_and_hms(2026, 3, 3, 12, 0, 0).unwrap())
    );

    let schedule = SlotEngine::default().schedule(&request).unwrap();
    assert!(schedule.is_complete());
    let lengths: Vec<i64> = schedule
        .placements()
        .map(|p| (p.end - p.start).num_minutes())
        .collect();
    assert_eq!(lengths, vec![120, 60]);
}

#[test]
fn records_follow_items_of_equal_sequence() {
    let engine = SlotEngine::default();
    let deadline = now() + Duration::days(1);
    let mut request = ScheduleRequest::new(now());
    request.items = vec![slot_engine::WorkItem {
        sequence: 1,
        estimated_minutes: 60,
        raw_time_hint: None,
        deadline,
    }];
    request.records = vec![
        record(0, Some(1.0), Due::At(deadline)),
        record(1, Some(1.0), Due::At(deadline)),
    ];

    let order: Vec<u32> = engine
        .schedule(&request)
        .unwrap()
        .entries
        .iter()
        .map(ScheduleEntry::sequence)
        .collect();
    assert_eq!(order, vec![0, 1, 1]);
}

#[test]
fn free_windows_span_record_deadlines() {
    let engine = SlotEngine::default();
    let mut request = ScheduleRequest::new(now());
    request.records = vec![record(
        1,
        None,
        Due::Date(NaiveDate::from_ymd_opt(2026, 3, 4).unwrap()),
    )];

    let days = engine.free_windows(&request).unwrap();
    let dates: Vec<NaiveDate> = days.iter().map(|d| d.date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
        ]
    );
}

#[test]
fn empty_request_has_no_windows() {
    let days = SlotEngine::default()
        .free_windows(&ScheduleRequest::new(now()))
        .unwrap();
    assert!(days.is_empty());
}
