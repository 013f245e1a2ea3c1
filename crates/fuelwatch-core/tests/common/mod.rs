//! Test doubles and common utilities for contract tests
//!
//! Every double is cheaply cloneable and shares its counters between clones,
//! so a test keeps one handle and hands another to the engine.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use fuelwatch_core::changelog::MemoryChangeLog;
use fuelwatch_core::config::{FuelType, WatchConfig};
use fuelwatch_core::error::{Error, Result};
use fuelwatch_core::traits::{
    ChangeLog, ChangeRecord, Clock, FeedQuery, FeedSource, Notifier, Signal, StationRecord,
};
use fuelwatch_core::{EngineEvent, WatchEngine};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// 2024-01-01 at `h:m:00`
pub fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

/// Station offering `fuel`, last updated at `updated_at`
pub fn offering(address: &str, fuel: FuelType, updated_at: NaiveDateTime) -> StationRecord {
    StationRecord::new(address, updated_at)
        .with_location("75001", "Paris")
        .offering(fuel, updated_at)
}

/// Station withholding `fuel`, record ingested at `ingested_at`
pub fn withholding(address: &str, fuel: FuelType, ingested_at: NaiveDateTime) -> StationRecord {
    StationRecord::new(address, ingested_at)
        .with_location("75001", "Paris")
        .withholding(fuel)
}

/// A feed that serves queued snapshots, repeating the last one once drained
#[derive(Clone, Default)]
pub struct ScriptedFeed {
    script: Arc<Mutex<VecDeque<std::result::Result<Vec<StationRecord>, String>>>>,
    last: Arc<Mutex<Vec<StationRecord>>>,
    fetch_count: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<FeedQuery>>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed that always returns `snapshot`
    pub fn serving(snapshot: Vec<StationRecord>) -> Self {
        let feed = Self::new();
        feed.push(snapshot);
        feed
    }

    /// Queue a snapshot
    pub fn push(&self, snapshot: Vec<StationRecord>) {
        self.script.lock().unwrap().push_back(Ok(snapshot));
    }

    /// Queue a fetch failure
    pub fn push_error(&self, message: &str) {
        self.script.lock().unwrap().push_back(Err(message.to_string()));
    }

    /// Number of fetch() calls
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Queries received, in order
    pub fn queries(&self) -> Vec<FeedQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl FeedSource for ScriptedFeed {
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<StationRecord>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());

        match self.script.lock().unwrap().pop_front() {
            Some(Ok(snapshot)) => {
                *self.last.lock().unwrap() = snapshot.clone();
                Ok(snapshot)
            }
            Some(Err(message)) => Err(Error::feed(message)),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A notifier that records every signal
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    signals: Arc<Mutex<Vec<Signal>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals received, in order
    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, signal: Signal) -> Result<()> {
        self.signals.lock().unwrap().push(signal);
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "recording"
    }
}

/// A settable clock
#[derive(Clone)]
pub struct FixedClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

/// A change log that accepts `budget` appends, then fails every write
#[derive(Clone)]
pub struct FailingChangeLog {
    inner: MemoryChangeLog,
    budget: Arc<AtomicUsize>,
    flush_count: Arc<AtomicUsize>,
}

impl FailingChangeLog {
    pub fn new(budget: usize) -> Self {
        Self {
            inner: MemoryChangeLog::new(),
            budget: Arc::new(AtomicUsize::new(budget)),
            flush_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Allow `budget` more appends
    pub fn refill(&self, budget: usize) {
        self.budget.store(budget, Ordering::SeqCst);
    }

    /// Rows actually written
    pub async fn records(&self) -> Vec<ChangeRecord> {
        self.inner.records().await
    }

    /// Number of flush() calls
    pub fn flush_count(&self) -> usize {
        self.flush_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChangeLog for FailingChangeLog {
    async fn replay(&self) -> Result<Vec<ChangeRecord>> {
        self.inner.replay().await
    }

    async fn append(&self, record: &ChangeRecord) -> Result<()> {
        let granted = self
            .budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !granted {
            return Err(Error::change_log("disk full"));
        }
        self.inner.append(record).await
    }

    async fn flush(&self) -> Result<()> {
        self.flush_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Minimal configuration watching E10 everywhere
pub fn minimal_config() -> WatchConfig {
    WatchConfig::new(FuelType::E10)
}

/// Build an engine from test doubles
pub fn build_engine(
    feed: &ScriptedFeed,
    log: Box<dyn ChangeLog>,
    notifier: &RecordingNotifier,
    clock: &FixedClock,
    config: WatchConfig,
) -> (WatchEngine, mpsc::Receiver<EngineEvent>) {
    WatchEngine::new(
        Box::new(feed.clone()),
        log,
        Box::new(notifier.clone()),
        Box::new(clock.clone()),
        config,
    )
    .expect("engine construction succeeds")
}

/// Drain every event currently queued
pub fn drain(events: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
