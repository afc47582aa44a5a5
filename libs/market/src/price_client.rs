use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::{MissingReason, Observation, SourceResult, Unit};
use crate::source::QuoteSource;

const USER_AGENT: &str = "market-snapshot/0.1";

#[derive(Clone)]
pub struct PriceClient {
    client: Client,
    base_api: String,
}

impl PriceClient {
    pub fn new(base_api: impl Into<String>, timeout: StdDuration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_api: base_api.into(),
        })
    }

    /// Daily closes between `now - lookback` and `now`, oldest first, with
    /// non-trading gaps dropped.
    pub async fn fetch_closes(
        &self,
        symbol: &str,
        lookback: Duration,
    ) -> Result<Vec<(NaiveDate, f64)>, reqwest::Error> {
        let end = Utc::now();
        let start = end - lookback;

        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_api.trim_end_matches('/'),
            symbol
        );

        let res: ChartResponse = self
            .client
            .get(url)
            .query(&[
                ("interval", "1d"),
                ("period1", &start.timestamp().to_string()),
                ("period2", &end.timestamp().to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(res.closes())
    }
}

#[async_trait]
impl QuoteSource for PriceClient {
    async fn fetch(&self, symbol: &str, lookback: Duration) -> SourceResult {
        let closes = match self.fetch_closes(symbol, lookback).await {
            Ok(c) => {
                debug!(symbol, closes = c.len(), "fetched closes");
                c
            }
            Err(e) => {
                warn!(symbol, error = %e, "fetch_closes failed");
                return SourceResult::Missing(MissingReason::from_request(&e));
            }
        };

        Observation::from_series(&closes, Unit::Price).into()
    }
}

//
// Match Yahoo chart JSON
// /v8/finance/chart/{symbol}
//
#[derive(Debug, Deserialize, Clone)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartResult {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuoteSeries {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Pairs timestamps with closes, skipping sessions with no close.
    pub fn closes(&self) -> Vec<(NaiveDate, f64)> {
        let Some(result) = self.chart.result.as_ref().and_then(|r| r.first()) else {
            return Vec::new();
        };
        let Some(series) = result.indicators.quote.first() else {
            return Vec::new();
        };

        let mut closes: Vec<(NaiveDate, f64)> = result
            .timestamp
            .iter()
            .zip(series.close.iter())
            .filter_map(|(ts, close)| {
                let close = (*close)?;
                let date = DateTime::from_timestamp(*ts, 0)?.date_naive();
                close.is_finite().then_some((date, close))
            })
            .collect();

        closes.sort_by_key(|(date, _)| *date);
        closes
    }
}
