use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::freshness::Freshness;
use crate::model::{MissingReason, Observation, SourceResult, Unit};
use crate::source::IndicatorSource;

/// FRED marks unreleased or withdrawn periods with a lone dot.
const NO_VALUE: &str = ".";

/// Newest observations requested per series; enough to step over placeholders.
const HISTORY_LIMIT: usize = 10;

#[derive(Clone)]
pub struct IndicatorClient {
    client: Client,
    base_api: String,
    api_key: String,
}

impl IndicatorClient {
    pub fn new(
        base_api: impl Into<String>,
        api_key: impl Into<String>,
        timeout: StdDuration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_api: base_api.into(),
            api_key: api_key.into(),
        })
    }

    pub async fn fetch_observations(
        &self,
        series_id: &str,
    ) -> Result<ObservationsResponse, reqwest::Error> {
        let url = format!(
            "{}/fred/series/observations",
            self.base_api.trim_end_matches('/')
        );

        self.client
            .get(url)
            .query(&[
                ("series_id", series_id),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", &HISTORY_LIMIT.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl IndicatorSource for IndicatorClient {
    async fn fetch(&self, series_id: &str, freshness: Freshness, unit: Unit) -> SourceResult {
        let res = match self.fetch_observations(series_id).await {
            Ok(r) => r,
            Err(e) => {
                warn!(series_id, error = %e, "fetch_observations failed");
                return SourceResult::Missing(MissingReason::from_request(&e));
            }
        };

        let points = res.values();
        debug!(series_id, values = points.len(), "parsed observations");

        let obs = match Observation::from_series(&points, unit) {
            Ok(o) => o,
            Err(reason) => return SourceResult::Missing(reason),
        };

        let result = freshness.gate(obs);
        if let SourceResult::Stale { as_of, .. } = &result {
            info!(series_id, %as_of, "latest release is stale");
        }
        result
    }
}

//
// Match FRED JSON
// https://fred.stlouisfed.org/docs/api/fred/series_observations.html
//
#[derive(Debug, Deserialize, Clone)]
pub struct ObservationsResponse {
    #[serde(default)]
    pub observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawObservation {
    pub date: String,
    pub value: String,
}

impl ObservationsResponse {
    /// Dated numeric values with placeholders and unparseable rows removed.
    pub fn values(&self) -> Vec<(NaiveDate, f64)> {
        self.observations
            .iter()
            .filter(|o| o.value.trim() != NO_VALUE)
            .filter_map(|o| {
                let date = NaiveDate::parse_from_str(&o.date, "%Y-%m-%d").ok()?;
                let value: f64 = o.value.trim().parse().ok()?;
                value.is_finite().then_some((date, value))
            })
            .collect()
    }
}
