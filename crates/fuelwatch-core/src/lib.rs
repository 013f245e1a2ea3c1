// # fuelwatch-core
//
// Core library for the fuel availability monitor.
//
// ## Architecture Overview
//
// This library provides the state-diffing and change-detection core:
// - **FeedSource**: Trait for fetching station snapshots from the upstream feed
// - **ChangeLog**: Trait for the append-only change log (the only durable state)
// - **Notifier**: Trait for announcing that availability appeared or disappeared
// - **Clock**: Trait for the wall clock, substituted in tests
// - **WatchEngine**: Poll loop that orchestrates fetch → reconcile → persist → notify
// - **Registry**: Plugin-based registry for feed sources and notifiers
//
// ## Design Principles
//
// 1. **Event Sourcing**: The last known state is a fold over the change log
// 2. **Pure Core**: Reconciliation, confidence and signal selection do no I/O
// 3. **Plugin-Based**: Feeds and notifiers are registered dynamically
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Crash Tolerance**: Append-only writes and a tolerant reader

pub mod traits;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod snapshot;
pub mod confidence;
pub mod trigger;
pub mod changelog;
pub mod notify;

// Re-export core types for convenience
pub use traits::{FeedSource, ChangeLog, Notifier, Clock};
pub use engine::{WatchEngine, EngineEvent, Mode, CycleReport};
pub use registry::Registry;
pub use config::{WatchConfig, FeedConfig, NotifierConfig, FuelType};
pub use error::{Error, Result};
pub use changelog::{MemoryChangeLog, FileChangeLog};
pub use confidence::Confidence;
