//! Snapshot reconciliation
//!
//! Diffs the last known state of every station against a freshly polled
//! snapshot and decides which stations changed.
//!
//! A station is a change when:
//! 1. it was never seen before, or
//! 2. its availability flipped, or
//! 3. it is still available and the feed reports a strictly newer update.
//!
//! Stations known from earlier cycles but missing from the snapshot entirely
//! are treated as having gone unavailable at `now`.
//!
//! Reconciliation is pure: nothing here touches the change log. The caller
//! persists `changes` and folds each one into its state once written.

use chrono::{NaiveDateTime, SubsecRound};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::config::FuelType;
use crate::traits::{ChangeRecord, StationRecord};

/// Durable belief about one station for the monitored fuel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationState {
    /// Whether the fuel is available
    pub available: bool,
    /// When that availability was observed
    pub observed_at: NaiveDateTime,
}

/// Last known state per station, keyed by address
pub type StationMap = BTreeMap<String, StationState>;

/// Apply one change record to a state map (last write wins)
pub fn apply(state: &mut StationMap, change: &ChangeRecord) {
    state.insert(
        change.address.clone(),
        StationState {
            available: change.available,
            observed_at: change.timestamp,
        },
    );
}

/// What one poll cycle amounted to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Number of change records produced
    pub changed: usize,
    /// Whether any change reported the fuel available
    pub any_available: bool,
    /// Whether any change reported the fuel unavailable
    pub any_unavailable: bool,
    /// First run only: the most recently updated available station
    pub best: Option<StationRecord>,
}

/// Output of [`reconcile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// State after applying every change
    pub current: StationMap,
    /// Changes to persist, snapshot order first, then absence transitions
    pub changes: Vec<ChangeRecord>,
    /// Cycle summary
    pub summary: CycleSummary,
}

/// Reconcile a snapshot against the previous state
///
/// # Parameters
///
/// - `previous`: Last known state
/// - `snapshot`: Records in feed order
/// - `fuel`: Monitored fuel type
/// - `first_run`: Whether to track the best available station
/// - `now`: Timestamp for absence-based transitions
pub fn reconcile(
    previous: &StationMap,
    snapshot: &[StationRecord],
    fuel: FuelType,
    first_run: bool,
    now: NaiveDateTime,
) -> Reconciliation {
    let mut current = previous.clone();
    let mut changes = Vec::new();
    let mut summary = CycleSummary::default();
    let mut best_at: Option<NaiveDateTime> = None;

    // Every address in the snapshot counts as present, proposed or not
    let present: HashSet<&str> = snapshot.iter().map(|r| r.address.as_str()).collect();

    for record in snapshot {
        if !record.reports_on(fuel) {
            continue;
        }

        let available = record.offers(fuel);
        let observed_at = record.observed_at(fuel);

        if first_run && available && best_at.is_none_or(|best| observed_at > best) {
            best_at = Some(observed_at);
            summary.best = Some(record.clone());
        }

        let changed = match current.get(&record.address) {
            None => true,
            Some(known) if known.available != available => true,
            Some(known) => available && observed_at > known.observed_at,
        };

        if !changed {
            debug!("{}: unchanged ({})", record.address, available);
            continue;
        }

        debug!("{}: changed -> {} at {}", record.address, available, observed_at);
        let change = ChangeRecord::new(observed_at, record.address.clone(), available);
        apply(&mut current, &change);
        changes.push(change);
    }

    let now = now.trunc_subsecs(0);
    for (address, known) in previous {
        if known.available && !present.contains(address.as_str()) {
            debug!("{}: no longer reported, marking unavailable", address);
            let change = ChangeRecord::new(now, address.clone(), false);
            apply(&mut current, &change);
            changes.push(change);
        }
    }

    summary.changed = changes.len();
    summary.any_available = changes.iter().any(|c| c.available);
    summary.any_unavailable = changes.iter().any(|c| !c.available);

    Reconciliation {
        current,
        changes,
        summary,
    }
}
