use async_trait::async_trait;
use chrono::Duration;

use crate::freshness::Freshness;
use crate::model::{FlowEndpoint, SourceResult, Unit};

/// Closing prices for one instrument.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// `lookback` should span several calendar days so weekends and holidays
    /// still leave two trading sessions.
    async fn fetch(&self, symbol: &str, lookback: Duration) -> SourceResult;
}

/// Macro-economic series. `unit` is carried onto the observation so the
/// renderer can phrase the value.
#[async_trait]
pub trait IndicatorSource: Send + Sync {
    async fn fetch(&self, series_id: &str, freshness: Freshness, unit: Unit) -> SourceResult;
}

/// Latest-period institutional buy/sell flows.
#[async_trait]
pub trait FlowSource: Send + Sync {
    async fn fetch(&self, endpoint: &FlowEndpoint) -> SourceResult;
}
