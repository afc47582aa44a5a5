use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::change::{self, ChangeResult, Direction};

/// How a value should be phrased when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Price,
    Level,
    /// Rates quoted in percent; changes read as percentage points.
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    InsufficientData,
    BadResponse,
    Timeout,
    RequestFailed,
    InvalidData,
    TaskFailed,
}

impl MissingReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingReason::InsufficientData => "insufficient_data",
            MissingReason::BadResponse => "bad_response",
            MissingReason::Timeout => "timeout",
            MissingReason::RequestFailed => "request_failed",
            MissingReason::InvalidData => "invalid_data",
            MissingReason::TaskFailed => "task_failed",
        }
    }

    /// Maps a transport error onto the reason recorded in the report.
    pub fn from_request(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            MissingReason::Timeout
        } else if err.is_status() || err.is_decode() {
            MissingReason::BadResponse
        } else {
            MissingReason::RequestFailed
        }
    }
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (latest, previous) pair for one instrument or indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub latest: f64,
    pub previous: f64,
    pub as_of: NaiveDate,
    pub previous_as_of: NaiveDate,
    pub unit: Unit,
}

impl Observation {
    pub fn new(
        latest: (NaiveDate, f64),
        previous: (NaiveDate, f64),
        unit: Unit,
    ) -> Result<Self, MissingReason> {
        let (as_of, latest) = latest;
        let (previous_as_of, previous) = previous;

        // Finite inputs can still overflow once subtracted.
        if !(latest - previous).is_finite() || previous_as_of >= as_of {
            return Err(MissingReason::InvalidData);
        }

        Ok(Self {
            latest,
            previous,
            as_of,
            previous_as_of,
            unit,
        })
    }

    /// Builds an observation from the two most recent points of a series.
    /// Points may arrive in any order; duplicate dates keep the last value seen.
    pub fn from_series(points: &[(NaiveDate, f64)], unit: Unit) -> Result<Self, MissingReason> {
        let mut points: Vec<(NaiveDate, f64)> = points
            .iter()
            .copied()
            .filter(|(_, v)| v.is_finite())
            .collect();

        points.sort_by_key(|(date, _)| *date);
        points.reverse();
        points.dedup_by_key(|(date, _)| *date);

        match points.as_slice() {
            [latest, previous, ..] => Self::new(*latest, *previous, unit),
            _ => Err(MissingReason::InsufficientData),
        }
    }

    pub fn change(&self) -> ChangeResult {
        change::compute(self.latest, self.previous)
    }
}

/// Buy/sell totals of one investor category for a single period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryFlow {
    pub category: String,
    pub buy: f64,
    pub sell: f64,
}

impl CategoryFlow {
    pub fn net(&self) -> f64 {
        self.buy - self.sell
    }

    pub fn direction(&self) -> Direction {
        Direction::of(self.net())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowSnapshot {
    pub period: NaiveDate,
    pub categories: Vec<CategoryFlow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Observation(Observation),
    Flow(FlowSnapshot),
}

/// Outcome of one provider call. Providers never return errors; every
/// failure is folded into `Missing`.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceResult {
    Ok(Payload),
    Missing(MissingReason),
    Stale { as_of: NaiveDate, threshold: Duration },
}

impl SourceResult {
    pub fn observation(&self) -> Option<&Observation> {
        match self {
            SourceResult::Ok(Payload::Observation(obs)) => Some(obs),
            _ => None,
        }
    }

    pub fn flow(&self) -> Option<&FlowSnapshot> {
        match self {
            SourceResult::Ok(Payload::Flow(flow)) => Some(flow),
            _ => None,
        }
    }

    pub fn missing_reason(&self) -> Option<MissingReason> {
        match self {
            SourceResult::Missing(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<Result<Observation, MissingReason>> for SourceResult {
    fn from(value: Result<Observation, MissingReason>) -> Self {
        match value {
            Ok(obs) => SourceResult::Ok(Payload::Observation(obs)),
            Err(reason) => SourceResult::Missing(reason),
        }
    }
}

//
// Requested items
//

#[derive(Debug, Clone)]
pub struct Instrument {
    pub symbol: String,
    pub label: String,
    pub group: String,
    /// Its direction is reported as the market volatility headline.
    pub volatility_gauge: bool,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, label: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            label: label.into(),
            group: group.into(),
            volatility_gauge: false,
        }
    }

    pub fn volatility_gauge(mut self) -> Self {
        self.volatility_gauge = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Indicator {
    pub series_id: String,
    pub label: String,
    pub group: String,
    pub unit: Unit,
    pub freshness_window: Duration,
}

impl Indicator {
    pub fn new(
        series_id: impl Into<String>,
        label: impl Into<String>,
        group: impl Into<String>,
        unit: Unit,
        freshness_window: Duration,
    ) -> Self {
        Self {
            series_id: series_id.into(),
            label: label.into(),
            group: group.into(),
            unit,
            freshness_window,
        }
    }
}

/// Session-guarded flow source: the handshake page sets the cookies the data
/// request needs.
#[derive(Debug, Clone)]
pub struct FlowEndpoint {
    pub handshake_url: String,
    pub data_url: String,
    pub label: String,
    pub group: String,
    pub categories: Vec<String>,
}

//
// Report
//

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub label: String,
    pub group: String,
    pub result: SourceResult,
    pub change: Option<ChangeResult>,
}

/// An indicator left out of the report because its latest release is too old.
#[derive(Debug, Clone, PartialEq)]
pub struct Suppressed {
    pub label: String,
    pub group: String,
    pub as_of: NaiveDate,
    pub threshold: Duration,
}

#[derive(Debug, Clone)]
pub struct Report {
    generated_at: DateTime<Utc>,
    date: NaiveDate,
    entries: Vec<Entry>,
    suppressed: Vec<Suppressed>,
    volatility: Option<Direction>,
}

impl Report {
    pub(crate) fn assemble(
        generated_at: DateTime<Utc>,
        date: NaiveDate,
        entries: Vec<Entry>,
        suppressed: Vec<Suppressed>,
    ) -> Self {
        Self {
            generated_at,
            date,
            entries,
            suppressed,
            volatility: None,
        }
    }

    pub(crate) fn with_volatility(mut self, volatility: Option<Direction>) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Direction of the volatility gauge, when it was requested and observed.
    pub fn volatility(&self) -> Option<Direction> {
        self.volatility
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn suppressed(&self) -> &[Suppressed] {
        &self.suppressed
    }

    pub fn entry(&self, label: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.label == label)
    }

    pub fn missing_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.result, SourceResult::Missing(_)))
            .count()
    }

    /// Entries grouped by heading, in order of first appearance.
    pub fn groups(&self) -> Vec<(&str, Vec<&Entry>)> {
        let mut groups: Vec<(&str, Vec<&Entry>)> = Vec::new();

        for entry in &self.entries {
            match groups.iter_mut().find(|(name, _)| *name == entry.group) {
                Some((_, members)) => members.push(entry),
                None => groups.push((entry.group.as_str(), vec![entry])),
            }
        }

        groups
    }
}
