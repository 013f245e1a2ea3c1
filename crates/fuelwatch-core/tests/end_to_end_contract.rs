//! Contract Test: End to End
//!
//! Drives the engine against a real file-backed change log.
//!
//! Constraints verified:
//! - A new available station produces exactly one row and a positive signal
//! - A station dropping out of the feed produces one unavailable row stamped
//!   with the wall clock, and a negative signal
//! - The file holds exactly the documented row layout

mod common;

use common::*;
use fuelwatch_core::{FuelType, WatchConfig};
use fuelwatch_core::changelog::FileChangeLog;
use fuelwatch_core::traits::Signal;

#[tokio::test]
async fn appear_then_disappear_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = minimal_config().with_data_dir(dir.path());
    let path = config.log_path();
    assert!(path.ends_with("all_e10_gas_availability_log.csv"));

    let feed = ScriptedFeed::new();
    feed.push(vec![offering("X", FuelType::E10, at(10, 0))]);
    feed.push(Vec::new());

    let notifier = RecordingNotifier::new();
    let clock = FixedClock::new(at(10, 5));
    let log = FileChangeLog::new(&path).await.unwrap();
    let (mut engine, _events) = build_engine(&feed, Box::new(log), &notifier, &clock, config);

    let first = tokio_test::assert_ok!(engine.run_cycle().await);
    assert_eq!(first.signal, Some(Signal::Positive));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "2024-01-01 10:00:00;X;True\n"
    );

    clock.set(at(11, 0));
    let second = tokio_test::assert_ok!(engine.run_cycle().await);
    assert_eq!(second.signal, Some(Signal::Negative));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "2024-01-01 10:00:00;X;True\n2024-01-01 11:00:00;X;False\n"
    );

    assert_eq!(notifier.signals(), vec![Signal::Positive, Signal::Negative]);
}

#[tokio::test]
async fn postal_code_scopes_query_and_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let config = WatchConfig::new(FuelType::Gazole)
        .with_postal_code("75001")
        .with_data_dir(dir.path());
    let path = config.log_path();
    assert!(path.ends_with("75001_gazole_gas_availability_log.csv"));

    let feed = ScriptedFeed::serving(vec![offering("1 Rue A", FuelType::Gazole, at(9, 0))]);
    let notifier = RecordingNotifier::new();
    let clock = FixedClock::new(at(9, 30));
    let log = FileChangeLog::new(&path).await.unwrap();
    let (mut engine, _events) = build_engine(&feed, Box::new(log), &notifier, &clock, config);

    engine.run_cycle().await.unwrap();

    let queries = feed.queries();
    assert_eq!(queries[0].fuel_type, FuelType::Gazole);
    assert_eq!(queries[0].postal_code.as_deref(), Some("75001"));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "2024-01-01 09:00:00;1 Rue A;True\n"
    );
}
