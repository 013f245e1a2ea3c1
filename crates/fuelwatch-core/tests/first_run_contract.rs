//! Contract Test: First Run
//!
//! Constraints verified:
//! - The first cycle reports the most recently confirmed available station
//! - The report happens even when nothing was logged
//! - Later cycles never report again
//! - The first-run mode survives a failed first cycle

mod common;

use common::*;
use fuelwatch_core::changelog::MemoryChangeLog;
use fuelwatch_core::traits::ChangeRecord;
use fuelwatch_core::{Confidence, EngineEvent, FuelType, Mode};

#[tokio::test]
async fn best_station_is_reported_with_confidence() {
    let feed = ScriptedFeed::serving(vec![
        offering("Old", FuelType::E10, at(3, 0)),
        offering("Fresh", FuelType::E10, at(9, 40)),
        withholding("Dry", FuelType::E10, at(9, 59)),
    ]);
    let notifier = RecordingNotifier::new();
    let clock = FixedClock::new(at(10, 0));
    let (mut engine, mut events) = build_engine(
        &feed,
        Box::new(MemoryChangeLog::new()),
        &notifier,
        &clock,
        minimal_config(),
    );

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.best.map(|s| s.address), Some("Fresh".to_string()));

    let best: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::BestAvailability {
                address,
                observed_at,
                confidence,
                ..
            } => Some((address, observed_at, confidence)),
            _ => None,
        })
        .collect();
    assert_eq!(
        best,
        vec![("Fresh".to_string(), at(9, 40), Confidence::VeryConfident)]
    );

    engine.run_cycle().await.unwrap();
    assert!(
        drain(&mut events)
            .iter()
            .all(|event| !matches!(event, EngineEvent::BestAvailability { .. }))
    );
}

#[tokio::test]
async fn best_station_reported_without_changes() {
    let log = MemoryChangeLog::with_records(vec![ChangeRecord::new(at(9, 0), "A", true)]);
    let feed = ScriptedFeed::serving(vec![offering("A", FuelType::E10, at(9, 0))]);
    let notifier = RecordingNotifier::new();
    let clock = FixedClock::new(at(17, 0));
    let (mut engine, _events) =
        build_engine(&feed, Box::new(log), &notifier, &clock, minimal_config());

    let report = engine.run_cycle().await.unwrap();
    assert!(report.changes.is_empty());
    assert_eq!(report.best.map(|s| s.address), Some("A".to_string()));
}

#[tokio::test]
async fn no_available_station_means_no_best() {
    let feed = ScriptedFeed::serving(vec![withholding("Dry", FuelType::E10, at(9, 0))]);
    let notifier = RecordingNotifier::new();
    let clock = FixedClock::new(at(10, 0));
    let (mut engine, _events) = build_engine(
        &feed,
        Box::new(MemoryChangeLog::new()),
        &notifier,
        &clock,
        minimal_config(),
    );

    let report = engine.run_cycle().await.unwrap();
    assert!(report.best.is_none());
    assert_eq!(engine.mode(), Mode::SteadyState);
}

#[tokio::test]
async fn failed_first_cycle_keeps_first_run_mode() {
    let feed = ScriptedFeed::new();
    feed.push_error("upstream unavailable");
    feed.push(vec![offering("A", FuelType::E10, at(9, 0))]);

    let notifier = RecordingNotifier::new();
    let clock = FixedClock::new(at(10, 0));
    let (mut engine, _events) = build_engine(
        &feed,
        Box::new(MemoryChangeLog::new()),
        &notifier,
        &clock,
        minimal_config(),
    );

    assert!(engine.run_cycle().await.is_err());
    assert_eq!(engine.mode(), Mode::FirstRun);

    let report = engine.run_cycle().await.unwrap();
    assert!(report.best.is_some());
    assert_eq!(engine.mode(), Mode::SteadyState);
}
