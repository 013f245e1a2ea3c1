// # Feed Source Trait
//
// Defines the interface for fetching station snapshots from the upstream
// fuel feed.
//
// ## Implementations
//
// - data.economie.gouv.fr records API: `fuelwatch-feed-economie` crate
//
// ## Usage
//
// ```rust,ignore
// use fuelwatch_core::traits::{FeedQuery, FeedSource};
// use fuelwatch_core::FuelType;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* FeedSource implementation */;
//
//     let query = FeedQuery::new(FuelType::Gazole, Some("75001".into()));
//     for station in source.fetch(&query).await? {
//         println!("{}: offers gazole = {}", station.address, station.offers(query.fuel_type));
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{NaiveDateTime, SubsecRound};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::FuelType;

/// What to ask the feed for in one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    /// Monitored fuel type
    pub fuel_type: FuelType,
    /// Optional postal code scope
    pub postal_code: Option<String>,
}

impl FeedQuery {
    /// Create a new feed query
    pub fn new(fuel_type: FuelType, postal_code: Option<String>) -> Self {
        Self {
            fuel_type,
            postal_code,
        }
    }
}

/// One upstream observation of a station
///
/// Lives for a single poll cycle only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationRecord {
    /// Free-text address, the station's identity key
    pub address: String,
    /// Postal code as reported by the feed
    pub postal_code: String,
    /// City as reported by the feed
    pub city: String,
    /// Fuel types currently offered
    pub offered: BTreeSet<FuelType>,
    /// Fuel types currently withheld (feed-dependent)
    pub withheld: BTreeSet<FuelType>,
    /// Per-fuel last update reported by the feed
    pub updated_at: BTreeMap<FuelType, NaiveDateTime>,
    /// When the feed ingested this record
    pub ingested_at: NaiveDateTime,
}

impl StationRecord {
    /// Create a record that reports on no fuel at all
    pub fn new(address: impl Into<String>, ingested_at: NaiveDateTime) -> Self {
        Self {
            address: address.into(),
            postal_code: String::new(),
            city: String::new(),
            offered: BTreeSet::new(),
            withheld: BTreeSet::new(),
            updated_at: BTreeMap::new(),
            ingested_at,
        }
    }

    /// Set postal code and city
    pub fn with_location(mut self, postal_code: impl Into<String>, city: impl Into<String>) -> Self {
        self.postal_code = postal_code.into();
        self.city = city.into();
        self
    }

    /// Mark a fuel as offered, last updated at `updated_at`
    pub fn offering(mut self, fuel: FuelType, updated_at: NaiveDateTime) -> Self {
        self.withheld.remove(&fuel);
        self.offered.insert(fuel);
        self.updated_at.insert(fuel, updated_at);
        self
    }

    /// Mark a fuel as withheld
    pub fn withholding(mut self, fuel: FuelType) -> Self {
        self.offered.remove(&fuel);
        self.withheld.insert(fuel);
        self
    }

    /// Whether the feed says anything about `fuel` for this station
    pub fn reports_on(&self, fuel: FuelType) -> bool {
        self.offered.contains(&fuel) || self.withheld.contains(&fuel)
    }

    /// Whether `fuel` is currently offered
    pub fn offers(&self, fuel: FuelType) -> bool {
        self.offered.contains(&fuel)
    }

    /// When the current availability of `fuel` was observed
    ///
    /// Offered fuels carry the feed's own update time. The feed does not
    /// timestamp absence, so withheld fuels fall back to the ingestion time,
    /// as do offered fuels the feed forgot to timestamp. Truncated to whole
    /// seconds, the precision of the change log.
    pub fn observed_at(&self, fuel: FuelType) -> NaiveDateTime {
        let observed = if self.offers(fuel) {
            self.updated_at
                .get(&fuel)
                .copied()
                .unwrap_or(self.ingested_at)
        } else {
            self.ingested_at
        };
        observed.trunc_subsecs(0)
    }
}

/// Trait for feed source implementations
///
/// A feed source is an **observer**: it turns one upstream response into an
/// ordered list of [`StationRecord`]s and nothing else.
///
/// ## Forbidden Capabilities
/// - ❌ Access the change log (owned by `WatchEngine`)
/// - ❌ Implement retry logic (owned by the caller of `WatchEngine::run`)
/// - ❌ Decide what counts as a change (owned by the reconciler)
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the current snapshot
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<StationRecord>)`: Records in feed order (authoritative)
    /// - `Err(Error)`: The cycle must not proceed
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<StationRecord>, crate::Error>;

    /// Name of this source, for logs
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing feed sources from configuration
pub trait FeedSourceFactory: Send + Sync {
    /// Create a FeedSource instance from configuration
    fn create(
        &self,
        config: &crate::config::FeedConfig,
    ) -> Result<Box<dyn FeedSource>, crate::Error>;
}
