//! Freshness classification of availability readings

use chrono::{Duration, NaiveDateTime};
use std::fmt;

/// How much to trust a reading, freshest first
///
/// Ordering follows age: a larger age never compares lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    /// Less than an hour old
    VeryConfident,
    /// One to two hours old
    Confident,
    /// Two to six hours old
    Unsure,
    /// Six hours or older
    ProbablyOutdated,
}

impl Confidence {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Confidence::VeryConfident => "Very confident (less than an hour)",
            Confidence::Confident => "Confident (from 1 to 2 hours)",
            Confidence::Unsure => "Unsure (from 2 to 6 hours)",
            Confidence::ProbablyOutdated => "Probably outdated (more than 6 hours)",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify an age in seconds. Negative ages (clock skew) count as fresh.
pub fn classify_age_secs(age_secs: i64) -> Confidence {
    if age_secs < 3600 {
        Confidence::VeryConfident
    } else if age_secs < 7200 {
        Confidence::Confident
    } else if age_secs < 21600 {
        Confidence::Unsure
    } else {
        Confidence::ProbablyOutdated
    }
}

/// Classify an age
pub fn classify_age(age: Duration) -> Confidence {
    classify_age_secs(age.num_seconds())
}

/// Classify a reading taken at `timestamp`, as seen at `now`
pub fn classify(timestamp: NaiveDateTime, now: NaiveDateTime) -> Confidence {
    classify_age(now.signed_duration_since(timestamp))
}
