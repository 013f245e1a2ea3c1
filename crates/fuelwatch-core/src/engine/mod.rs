//! Poll loop controller
//!
//! The WatchEngine is responsible for:
//! - Seeding the last known state from the ChangeLog
//! - Polling the FeedSource on a fixed interval
//! - Reconciling each snapshot against the last known state
//! - Persisting every change before the state moves past it
//! - Firing at most one Notifier signal per cycle
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ FeedSource  │─── Vec<StationRecord> ───┐
//! └─────────────┘                          │
//!                                          ▼
//!                                 ┌──────────────┐
//!                                 │ WatchEngine  │
//!                                 └──────────────┘
//!                                          │
//!         ┌────────────────────────────────┼────────────────────────────┐
//!         │                                │                            │
//!         ▼                                ▼                            ▼
//! ┌─────────────┐                ┌──────────────┐              ┌─────────────┐
//! │ ChangeLog   │                │  Notifier    │              │   Events    │
//! │ (append)    │                │  (signal)    │              │  (monitor)  │
//! └─────────────┘                └──────────────┘              └─────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Fetch the snapshot
//! 2. Reconcile against the last known state
//! 3. Append each change, advancing the state per successful write
//! 4. Log newly available stations with their confidence
//! 5. Fire the notification trigger
//! 6. First cycle only: report the most recently confirmed station
//!
//! A failed fetch or write ends `run` with the error. The engine keeps its
//! state and mode, so the caller can back off and call `run` again.

use chrono::NaiveDateTime;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::confidence::{self, Confidence};
use crate::config::{FuelType, WatchConfig};
use crate::error::Result;
use crate::reconcile::{self, StationMap};
use crate::snapshot;
use crate::traits::{ChangeLog, ChangeRecord, Clock, FeedQuery, FeedSource, Notifier, Signal, StationRecord};
use crate::trigger;

/// Events emitted by the WatchEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine loop started
    Started {
        fuel_type: FuelType,
        postal_code: Option<String>,
        interval: Duration,
    },

    /// A change was durably appended to the log
    ChangeRecorded {
        address: String,
        available: bool,
        timestamp: NaiveDateTime,
    },

    /// A cycle finished
    CycleCompleted {
        changed: usize,
        signal: Option<Signal>,
    },

    /// First cycle report of the most recently confirmed station
    BestAvailability {
        address: String,
        postal_code: String,
        city: String,
        observed_at: NaiveDateTime,
        confidence: Confidence,
    },

    /// A cycle failed and `run` is returning the error
    CycleFailed {
        error: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Lifecycle mode of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No cycle has completed yet; the best station will be reported
    FirstRun,
    /// At least one cycle completed
    SteadyState,
}

/// Outcome of one successful cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Changes appended to the log, in order
    pub changes: Vec<ChangeRecord>,
    /// Signal fired, if any
    pub signal: Option<Signal>,
    /// Most recently confirmed available station (first cycle only)
    pub best: Option<StationRecord>,
}

/// Poll loop engine
///
/// ## Lifecycle
///
/// 1. Create with [`WatchEngine::new()`] (validates, no I/O)
/// 2. Start with [`WatchEngine::run()`]
/// 3. Engine runs until Ctrl-C or until a cycle fails
///
/// ## Load Resistance
///
/// Events go through a bounded channel. When it is full, events are dropped
/// with a warning instead of growing memory.
pub struct WatchEngine {
    /// Feed source polled each cycle
    feed: Box<dyn FeedSource>,

    /// Durable change stream
    change_log: Box<dyn ChangeLog>,

    /// Signal sink
    notifier: Box<dyn Notifier>,

    /// Wall clock for absence timestamps and confidence
    clock: Box<dyn Clock>,

    /// What to fetch
    query: FeedQuery,

    /// Effective poll interval (already clamped)
    interval: Duration,

    /// Last known state, always the fold of the log
    state: StationMap,

    /// Lifecycle mode
    mode: Mode,

    /// Whether the state has been replayed from the log
    seeded: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl WatchEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        feed: Box<dyn FeedSource>,
        change_log: Box<dyn ChangeLog>,
        notifier: Box<dyn Notifier>,
        clock: Box<dyn Clock>,
        config: WatchConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);
        let interval = config.effective_interval();

        let engine = Self {
            feed,
            change_log,
            notifier,
            clock,
            query: FeedQuery::new(config.fuel_type, config.postal_code),
            interval,
            state: StationMap::new(),
            mode: Mode::FirstRun,
            seeded: false,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Current lifecycle mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Last known state
    pub fn state(&self) -> &StationMap {
        &self.state
    }

    /// Effective poll interval
    pub fn poll_interval(&self) -> Duration {
        self.interval
    }

    /// Monitored fuel type
    pub fn fuel_type(&self) -> FuelType {
        self.query.fuel_type
    }

    /// Run the engine until Ctrl-C
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: A cycle failed; call `run` again to resume
    pub async fn run(&mut self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the engine until `shutdown_rx` fires
    ///
    /// **TESTING ONLY**: production code should use `run()`, which stops
    /// on OS signals.
    pub async fn run_with_shutdown(&mut self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&mut self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for shutdown signal: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        info!(
            "Watching {} in {} every {}s",
            self.query.fuel_type,
            self.query.postal_code.as_deref().unwrap_or("all postal codes"),
            self.interval.as_secs()
        );
        self.emit_event(EngineEvent::Started {
            fuel_type: self.query.fuel_type,
            postal_code: self.query.postal_code.clone(),
            interval: self.interval,
        });

        loop {
            tokio::select! {
                result = self.run_cycle() => {
                    if let Err(e) = result {
                        error!("Poll cycle failed: {}", e);
                        self.emit_event(EngineEvent::CycleFailed {
                            error: e.to_string(),
                        });
                        return Err(e);
                    }
                }
                _ = &mut shutdown => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => break,
            }
        }

        info!("Shutdown signal received");
        self.emit_event(EngineEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });

        // Flush the log before exiting
        self.change_log.flush().await?;
        info!("Change log flushed, engine stopped");

        Ok(())
    }

    /// Run a single poll cycle
    ///
    /// Seeds the state from the change log on first use.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.seed().await?;

        let fuel = self.query.fuel_type;
        let snapshot = self.feed.fetch(&self.query).await?;
        let now = self.clock.now();
        debug!(
            "{} returned {} record(s)",
            self.feed.source_name(),
            snapshot.len()
        );

        let reconciliation = reconcile::reconcile(
            &self.state,
            &snapshot,
            fuel,
            self.mode == Mode::FirstRun,
            now,
        );
        let summary = reconciliation.summary;
        let changes = reconciliation.changes;

        self.record(&changes).await?;

        if summary.changed > 0 {
            info!("{} availability change(s) recorded", summary.changed);
        }

        for change in changes.iter().filter(|c| c.available) {
            info!(
                "{} available at {} ({})",
                fuel,
                change.address,
                confidence::classify(change.timestamp, now)
            );
        }

        let signal = trigger::select_signal(&summary);
        if let Some(signal) = signal
            && let Err(e) = self.notifier.notify(signal).await
        {
            warn!(
                "Notifier {} failed on {} signal: {}",
                self.notifier.notifier_name(),
                signal,
                e
            );
        }

        if self.mode == Mode::FirstRun {
            self.report_best(summary.best.as_ref(), now);
            self.mode = Mode::SteadyState;
        }

        self.emit_event(EngineEvent::CycleCompleted {
            changed: summary.changed,
            signal,
        });

        Ok(CycleReport {
            changes,
            signal,
            best: summary.best,
        })
    }

    async fn seed(&mut self) -> Result<()> {
        if !self.seeded {
            self.state = snapshot::load(self.change_log.as_ref()).await?;
            self.seeded = true;
            info!("Loaded last known state of {} station(s)", self.state.len());
        }
        Ok(())
    }

    /// Append changes in order, folding each into the state once written
    async fn record(&mut self, changes: &[ChangeRecord]) -> Result<()> {
        for change in changes {
            self.change_log.append(change).await?;
            reconcile::apply(&mut self.state, change);
            self.emit_event(EngineEvent::ChangeRecorded {
                address: change.address.clone(),
                available: change.available,
                timestamp: change.timestamp,
            });
        }
        Ok(())
    }

    fn report_best(&self, best: Option<&StationRecord>, now: NaiveDateTime) {
        let fuel = self.query.fuel_type;
        let Some(station) = best else {
            info!("No station currently offers {}", fuel);
            return;
        };

        let observed_at = station.observed_at(fuel);
        let confidence = confidence::classify(observed_at, now);
        info!(
            "Most recent {} availability: {}, {} {} at {} ({})",
            fuel, station.address, station.postal_code, station.city, observed_at, confidence
        );
        self.emit_event(EngineEvent::BestAvailability {
            address: station.address.clone(),
            postal_code: station.postal_code.clone(),
            city: station.city.clone(),
            observed_at,
            confidence,
        });
    }

    /// Emit an engine event, dropping it if the channel is full
    fn emit_event(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
