// # Economie Feed Source
//
// This crate provides the data.economie.gouv.fr feed source for fuelwatch.
//
// ## Purpose
//
// Polls the "prix des carburants en France - flux instantané" dataset through
// the records search API and turns each returned record into a
// `StationRecord`.
//
// ## Record Shape
//
// ```json
// {
//   "record_timestamp": "2024-01-01T09:12:44.123Z",
//   "fields": {
//     "adresse": "12 Rue de la Paix",
//     "cp": "75001",
//     "ville": "Paris",
//     "carburants_disponibles": "Gazole;E10",
//     "carburants_indisponibles": "SP98",
//     "e10_maj": "2024-01-01 08:55:00"
//   }
// }
// ```
//
// `record_timestamp` is UTC and is converted to local wall-clock time. The
// `<fuel>_maj` fields are already local.

use chrono::{DateTime, Local, NaiveDateTime};
use fuelwatch_core::Registry;
use fuelwatch_core::config::{FeedConfig, FuelType};
use fuelwatch_core::traits::{FeedQuery, FeedSource, FeedSourceFactory, StationRecord, TIMESTAMP_FORMAT};
use fuelwatch_core::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

const SOURCE: &str = "economie";

/// Body of a records search response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Matching records, in API order
    #[serde(default)]
    pub records: Vec<ApiRecord>,
}

/// One record of a search response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiRecord {
    /// Dataset fields
    #[serde(default)]
    pub fields: Map<String, Value>,

    /// When the platform ingested the record (RFC 3339, UTC)
    #[serde(default)]
    pub record_timestamp: Option<String>,
}

/// data.economie.gouv.fr feed source
pub struct EconomieFeedSource {
    /// Records search endpoint
    url: String,

    /// Dataset identifier
    dataset: String,

    /// Maximum rows per request
    rows: u32,

    /// HTTP client
    client: reqwest::Client,
}

impl EconomieFeedSource {
    /// Create a new feed source
    ///
    /// # Parameters
    ///
    /// - `url`: Records search endpoint
    /// - `dataset`: Dataset identifier
    /// - `rows`: Maximum rows per request
    /// - `timeout`: HTTP request timeout
    pub fn new(url: String, dataset: String, rows: u32, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url,
            dataset,
            rows,
            client,
        })
    }

    /// Query string for one poll
    pub fn query_params(&self, query: &FeedQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("dataset", self.dataset.clone()),
            ("facet", "carburants_disponibles".to_string()),
            ("facet", "cp".to_string()),
            ("rows", self.rows.to_string()),
        ];
        if let Some(postal_code) = &query.postal_code {
            params.push(("refine.cp", postal_code.clone()));
        }
        params
    }
}

#[async_trait::async_trait]
impl FeedSource for EconomieFeedSource {
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<StationRecord>> {
        let response = self
            .client
            .get(&self.url)
            .query(&self.query_params(query))
            .send()
            .await
            .map_err(|e| Error::provider(SOURCE, format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::provider(
                SOURCE,
                format!("HTTP error: {}", response.status()),
            ));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(SOURCE, format!("Failed to decode response: {}", e)))?;

        let fetched_at = Local::now().naive_local();
        let stations = parse_records(body, fetched_at);
        tracing::debug!("Fetched {} station record(s)", stations.len());
        Ok(stations)
    }

    fn source_name(&self) -> &'static str {
        SOURCE
    }
}

/// Convert a search response into station records
///
/// Records without an address are dropped. A record without a usable
/// `record_timestamp` is stamped with `fetched_at`.
pub fn parse_records(response: SearchResponse, fetched_at: NaiveDateTime) -> Vec<StationRecord> {
    response
        .records
        .into_iter()
        .filter_map(|record| parse_record(record, fetched_at))
        .collect()
}

fn parse_record(record: ApiRecord, fetched_at: NaiveDateTime) -> Option<StationRecord> {
    let fields = &record.fields;

    let Some(address) = text(fields, "adresse")
        .map(|a| single_line(&a))
        .filter(|a| !a.is_empty())
    else {
        tracing::debug!("Dropping record without an address");
        return None;
    };

    let ingested_at = record
        .record_timestamp
        .as_deref()
        .and_then(parse_utc)
        .unwrap_or(fetched_at);

    let mut station = StationRecord::new(address, ingested_at).with_location(
        text(fields, "cp").unwrap_or_default(),
        text(fields, "ville").unwrap_or_default(),
    );

    for fuel in fuel_list(fields, "carburants_disponibles") {
        station.offered.insert(fuel);
        let key = format!("{}_maj", fuel.field_prefix());
        if let Some(updated_at) = text(fields, &key).as_deref().and_then(parse_update_time) {
            station.updated_at.insert(fuel, updated_at);
        }
    }

    for fuel in fuel_list(fields, "carburants_indisponibles") {
        if !station.offered.contains(&fuel) {
            station.withheld.insert(fuel);
        }
    }

    Some(station)
}

/// String value of a field; numbers are rendered as text
fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Collapse embedded line breaks, so each address is one change log line
fn single_line(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fuel types named in a semicolon list, unknown names ignored
fn fuel_list(fields: &Map<String, Value>, key: &str) -> Vec<FuelType> {
    text(fields, key)
        .map(|list| {
            list.split(';')
                .filter_map(|name| name.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// `<fuel>_maj` timestamp: local `YYYY-MM-DD HH:MM:SS`, or RFC 3339
fn parse_update_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| parse_utc(raw))
}

/// RFC 3339 instant as local wall-clock time
fn parse_utc(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|instant| instant.with_timezone(&Local).naive_local())
}

/// Factory for creating economie feed sources
pub struct EconomieFactory;

impl FeedSourceFactory for EconomieFactory {
    fn create(&self, config: &FeedConfig) -> Result<Box<dyn FeedSource>> {
        match config {
            FeedConfig::Economie {
                url,
                dataset,
                rows,
                timeout_secs,
            } => Ok(Box::new(EconomieFeedSource::new(
                url.clone(),
                dataset.clone(),
                *rows,
                Duration::from_secs(*timeout_secs),
            )?)),
            _ => Err(Error::config("Invalid config for economie feed source")),
        }
    }
}

/// Register the economie feed source with a registry
pub fn register(registry: &Registry) {
    registry.register_feed(SOURCE, Box::new(EconomieFactory));
}
