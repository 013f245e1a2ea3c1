//! Core traits for the fuelwatch system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`FeedSource`]: Fetch station snapshots from the upstream feed
//! - [`ChangeLog`]: Append-only durable log of availability changes
//! - [`Notifier`]: Announce positive/negative signals
//! - [`Clock`]: Current local time

pub mod feed_source;
pub mod change_log;
pub mod notifier;
pub mod clock;

pub use feed_source::{FeedSource, FeedQuery, StationRecord, FeedSourceFactory};
pub use change_log::{ChangeLog, ChangeRecord, TIMESTAMP_FORMAT};
pub use notifier::{Notifier, Signal, NotifierFactory};
pub use clock::{Clock, SystemClock};
