use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt, stream};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, info_span, instrument, warn};
use tracing_futures::Instrument as _;

use crate::freshness::Freshness;
use crate::model::{
    Entry, FlowEndpoint, Indicator, Instrument, MissingReason, Report, SourceResult, Suppressed,
};
use crate::source::{FlowSource, IndicatorSource, QuoteSource};

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Upper bound for a single provider call.
    pub call_timeout: Duration,
    /// Upper bound for the whole fan-out; anything still pending is cancelled.
    pub run_deadline: Duration,
    /// Calendar days of closes requested per instrument.
    pub lookback: chrono::Duration,
    pub max_in_flight: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(15),
            run_deadline: Duration::from_secs(60),
            lookback: chrono::Duration::days(7),
            max_in_flight: 16,
        }
    }
}

struct Slot {
    label: String,
    group: String,
    gauge: bool,
    task: BoxFuture<'static, SourceResult>,
}

/// Fans out one task per requested item and folds the results into a
/// [`Report`] in request order.
pub struct Aggregator {
    quotes: Arc<dyn QuoteSource>,
    indicators: Arc<dyn IndicatorSource>,
    flows: Arc<dyn FlowSource>,
    settings: Settings,
}

impl Aggregator {
    pub fn new(
        quotes: Arc<dyn QuoteSource>,
        indicators: Arc<dyn IndicatorSource>,
        flows: Arc<dyn FlowSource>,
    ) -> Self {
        Self {
            quotes,
            indicators,
            flows,
            settings: Settings::default(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[instrument(
        name = "build_report",
        skip_all,
        fields(instruments = instruments.len(), indicators = indicators.len(), flow = flow.is_some(), today = %today)
    )]
    pub async fn build_report(
        &self,
        instruments: &[Instrument],
        indicators: &[Indicator],
        flow: Option<&FlowEndpoint>,
        today: NaiveDate,
    ) -> Report {
        let slots = self.plan(instruments, indicators, flow, today);
        let started = Instant::now();
        let deadline = started + self.settings.run_deadline;
        let call_timeout = self.settings.call_timeout;

        let (meta, tasks): (Vec<_>, Vec<_>) = slots
            .into_iter()
            .map(|s| ((s.label, s.group, s.gauge), s.task))
            .unzip();

        // `buffered` yields in submission order whatever the completion order.
        let results: Vec<SourceResult> = stream::iter(tasks)
            .map(|task| guarded(task, call_timeout, deadline))
            .buffered(self.settings.max_in_flight.max(1))
            .collect()
            .await;

        let mut entries = Vec::with_capacity(results.len());
        let mut suppressed = Vec::new();
        let mut volatility = None;

        for ((label, group, gauge), result) in meta.into_iter().zip(results) {
            match result {
                SourceResult::Stale { as_of, threshold } => {
                    info!(%label, %as_of, "suppressing stale entry");
                    suppressed.push(Suppressed {
                        label,
                        group,
                        as_of,
                        threshold,
                    });
                }
                result => {
                    if let Some(reason) = result.missing_reason() {
                        warn!(%label, %reason, "entry unavailable");
                    }
                    let change = result.observation().map(|o| o.change());
                    if gauge && volatility.is_none() {
                        volatility = change.map(|c| c.direction);
                    }
                    entries.push(Entry {
                        label,
                        group,
                        result,
                        change,
                    });
                }
            }
        }

        let report =
            Report::assemble(Utc::now(), today, entries, suppressed).with_volatility(volatility);

        info!(
            entries = report.entries().len(),
            missing = report.missing_count(),
            stale = report.suppressed().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "report assembled"
        );

        report
    }

    fn plan(
        &self,
        instruments: &[Instrument],
        indicators: &[Indicator],
        flow: Option<&FlowEndpoint>,
        today: NaiveDate,
    ) -> Vec<Slot> {
        let mut slots = Vec::with_capacity(instruments.len() + indicators.len() + 1);
        let lookback = self.settings.lookback;

        for inst in instruments {
            let quotes = Arc::clone(&self.quotes);
            let symbol = inst.symbol.clone();
            let span = info_span!("quote", symbol = %symbol);

            slots.push(Slot {
                label: inst.label.clone(),
                group: inst.group.clone(),
                gauge: inst.volatility_gauge,
                task: async move { quotes.fetch(&symbol, lookback).await }
                    .instrument(span)
                    .boxed(),
            });
        }

        for ind in indicators {
            let source = Arc::clone(&self.indicators);
            let series_id = ind.series_id.clone();
            let freshness = Freshness::new(ind.freshness_window, today);
            let unit = ind.unit;
            let span = info_span!("indicator", series_id = %series_id);

            slots.push(Slot {
                label: ind.label.clone(),
                group: ind.group.clone(),
                gauge: false,
                task: async move { source.fetch(&series_id, freshness, unit).await }
                    .instrument(span)
                    .boxed(),
            });
        }

        if let Some(endpoint) = flow {
            let source = Arc::clone(&self.flows);
            let endpoint = endpoint.clone();
            let span = info_span!("flow", url = %endpoint.data_url);

            slots.push(Slot {
                label: endpoint.label.clone(),
                group: endpoint.group.clone(),
                gauge: false,
                task: async move { source.fetch(&endpoint).await }
                    .instrument(span)
                    .boxed(),
            });
        }

        slots
    }
}

/// Runs one provider call on its own task so a panic or hang stays local.
async fn guarded(
    task: BoxFuture<'static, SourceResult>,
    call_timeout: Duration,
    deadline: Instant,
) -> SourceResult {
    let handle = tokio::spawn(timeout(call_timeout, task));
    let abort = handle.abort_handle();

    match timeout_at(deadline, handle).await {
        Ok(Ok(Ok(result))) => result,
        Ok(Ok(Err(_))) => {
            debug!("provider call timed out");
            SourceResult::Missing(MissingReason::Timeout)
        }
        Ok(Err(e)) => {
            warn!(error = %e, "provider task failed");
            SourceResult::Missing(MissingReason::TaskFailed)
        }
        Err(_) => {
            abort.abort();
            debug!("run deadline reached, cancelling provider call");
            SourceResult::Missing(MissingReason::Timeout)
        }
    }
}
