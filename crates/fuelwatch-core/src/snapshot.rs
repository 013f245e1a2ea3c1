//! Startup replay of the change log into the last known state

use tracing::debug;

use crate::error::Result;
use crate::reconcile::{self, StationMap};
use crate::traits::{ChangeLog, ChangeRecord};

/// Fold change records in order, last write wins per address
pub fn fold<'a, I>(records: I) -> StationMap
where
    I: IntoIterator<Item = &'a ChangeRecord>,
{
    let mut state = StationMap::new();
    for record in records {
        reconcile::apply(&mut state, record);
    }
    state
}

/// Rebuild the last known state from a change log
///
/// A log that does not exist yet is an empty state.
pub async fn load(log: &dyn ChangeLog) -> Result<StationMap> {
    let records = log.replay().await?;
    let state = fold(&records);
    debug!(
        "Replayed {} change record(s) into {} station(s)",
        records.len(),
        state.len()
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::MemoryChangeLog;
    use crate::reconcile::StationState;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn last_write_wins() {
        let records = [
            ChangeRecord::new(at(8), "X", true),
            ChangeRecord::new(at(9), "Y", true),
            ChangeRecord::new(at(10), "X", false),
        ];
        let state = fold(&records);

        assert_eq!(
            state["X"],
            StationState {
                available: false,
                observed_at: at(10)
            }
        );
        assert!(state["Y"].available);
    }

    #[tokio::test]
    async fn empty_log_is_empty_state() {
        let log = MemoryChangeLog::new();
        assert!(load(&log).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_folds_log_in_order() {
        let log = MemoryChangeLog::new();
        log.append(&ChangeRecord::new(at(8), "X", false)).await.unwrap();
        log.append(&ChangeRecord::new(at(9), "X", true)).await.unwrap();

        let state = load(&log).await.unwrap();
        assert_eq!(state.len(), 1);
        assert!(state["X"].available);
        assert_eq!(state["X"].observed_at, at(9));
    }
}
