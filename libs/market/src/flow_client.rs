use std::collections::BTreeMap;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, header};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::{CategoryFlow, FlowEndpoint, FlowSnapshot, MissingReason, Payload, SourceResult};
use crate::source::FlowSource;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Investor flow source behind a cookie-gated session.
///
/// Each fetch builds its own cookie jar, so no session state outlives a run.
#[derive(Clone)]
pub struct FlowClient {
    timeout: StdDuration,
}

impl FlowClient {
    pub fn new(timeout: StdDuration) -> Self {
        Self { timeout }
    }

    fn session(&self) -> Result<Client, reqwest::Error> {
        Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(self.timeout)
            .build()
    }

    /// Handshake then data request. Returns `None` for a non-2xx or empty body.
    pub async fn fetch_body(&self, endpoint: &FlowEndpoint) -> Result<Option<String>, reqwest::Error> {
        let client = self.session()?;

        let handshake = client.get(&endpoint.handshake_url).send().await?;
        if !handshake.status().is_success() {
            debug!(status = %handshake.status(), "handshake rejected");
            return Ok(None);
        }

        let res = client
            .get(&endpoint.data_url)
            .header(header::REFERER, &endpoint.handshake_url)
            .header(header::ACCEPT, "application/json, text/plain, */*")
            .send()
            .await?;

        if !res.status().is_success() {
            debug!(status = %res.status(), "data request rejected");
            return Ok(None);
        }

        let body = res.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(body))
    }
}

#[async_trait]
impl FlowSource for FlowClient {
    async fn fetch(&self, endpoint: &FlowEndpoint) -> SourceResult {
        let body = match self.fetch_body(endpoint).await {
            Ok(Some(b)) => b,
            Ok(None) => {
                warn!(url = %endpoint.data_url, "flow source returned no usable body");
                return SourceResult::Missing(MissingReason::BadResponse);
            }
            Err(e) => {
                warn!(url = %endpoint.data_url, error = %e, "flow request failed");
                return SourceResult::Missing(MissingReason::from_request(&e));
            }
        };

        let periods: Vec<FlowPeriod> = match serde_json::from_str(&body) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "flow body is not a period array");
                return SourceResult::Missing(MissingReason::BadResponse);
            }
        };

        match latest_snapshot(&periods, &endpoint.categories) {
            Ok(snapshot) => SourceResult::Ok(Payload::Flow(snapshot)),
            Err(reason) => SourceResult::Missing(reason),
        }
    }
}

//
// Flow source JSON: one record per period with per-category totals
// [{"period":"2026-10-16","flows":{"foreign":{"buy":1.0,"sell":2.0}}}]
//
#[derive(Debug, Deserialize, Clone)]
pub struct FlowPeriod {
    pub period: NaiveDate,
    pub flows: BTreeMap<String, BuySell>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct BuySell {
    pub buy: f64,
    pub sell: f64,
}

/// Picks the most recent period and extracts `categories` in the given order.
pub fn latest_snapshot(
    periods: &[FlowPeriod],
    categories: &[String],
) -> Result<FlowSnapshot, MissingReason> {
    let latest = periods
        .iter()
        .max_by_key(|p| p.period)
        .ok_or(MissingReason::InsufficientData)?;

    let categories = categories
        .iter()
        .map(|name| {
            let totals = latest
                .flows
                .get(name)
                .ok_or(MissingReason::InsufficientData)?;

            if !(totals.buy - totals.sell).is_finite() {
                return Err(MissingReason::InvalidData);
            }

            Ok(CategoryFlow {
                category: name.clone(),
                buy: totals.buy,
                sell: totals.sell,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FlowSnapshot {
        period: latest.period,
        categories,
    })
}
