use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use market::{
    Aggregator, DispatchError, FileSink, FlowClient, FlowEndpoint, Format, Indicator,
    IndicatorClient, Instrument, PriceClient, Report, Settings, Sink, WebhookSink, dispatch_all,
    render,
};
use tracing::{error, info, instrument};

use crate::catalog;
use crate::config::Config;

const WEBHOOK_BACKOFF: Duration = Duration::from_secs(2);

struct Route {
    format: Format,
    sinks: Vec<Box<dyn Sink>>,
}

/// One delivery attempt of one rendered format to one sink.
#[derive(Debug)]
pub struct Delivery {
    pub format: Format,
    pub sink: String,
    pub result: Result<(), DispatchError>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub deliveries: Vec<Delivery>,
}

impl RunOutcome {
    pub fn failures(&self) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter().filter(|d| d.result.is_err())
    }

    pub fn succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Aggregate, then render each routed format once and hand it to its sinks.
pub struct Pipeline {
    aggregator: Aggregator,
    instruments: Vec<Instrument>,
    indicators: Vec<Indicator>,
    flow: Option<FlowEndpoint>,
    routes: Vec<Route>,
}

impl Pipeline {
    pub fn new(
        aggregator: Aggregator,
        instruments: Vec<Instrument>,
        indicators: Vec<Indicator>,
        flow: Option<FlowEndpoint>,
    ) -> Self {
        Self {
            aggregator,
            instruments,
            indicators,
            flow,
            routes: Vec::new(),
        }
    }

    /// Sends `format` to `sink`. Formats render in the order first routed.
    pub fn route(mut self, format: Format, sink: impl Sink + 'static) -> Self {
        match self.routes.iter_mut().find(|r| r.format == format) {
            Some(route) => route.sinks.push(Box::new(sink)),
            None => self.routes.push(Route {
                format,
                sinks: vec![Box::new(sink)],
            }),
        }
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.provider_timeout;

        let quotes = PriceClient::new(&config.quote_api_base, timeout)
            .context("failed to build quote client")?;
        let indicators = IndicatorClient::new(&config.fred_api_base, &config.fred_api_key, timeout)
            .context("failed to build indicator client")?;
        let flows = FlowClient::new(timeout);

        let aggregator = Aggregator::new(Arc::new(quotes), Arc::new(indicators), Arc::new(flows))
            .with_settings(Settings {
                call_timeout: timeout,
                run_deadline: config.run_deadline,
                ..Settings::default()
            });

        let webhook = WebhookSink::new(&config.webhook_url, timeout)
            .context("failed to build webhook sink")?
            .with_retry(config.webhook_max_attempts, WEBHOOK_BACKOFF);

        let pipeline = Self::new(
            aggregator,
            catalog::instruments(),
            catalog::indicators(),
            config.flow.as_ref().map(catalog::flow_endpoint),
        )
        .route(Format::Text, FileSink::new(config.summary_path()))
        .route(Format::Json, FileSink::new(config.data_path()))
        .route(Format::ChatMarkup, webhook);

        Ok(pipeline)
    }

    #[instrument(name = "run_report", skip(self), fields(today = %today))]
    pub async fn run(&self, today: NaiveDate) -> RunOutcome {
        let report = self
            .aggregator
            .build_report(&self.instruments, &self.indicators, self.flow.as_ref(), today)
            .await;

        let mut deliveries = Vec::new();

        for route in &self.routes {
            let artifact = render(&report, route.format);
            let sinks: Vec<&dyn Sink> = route.sinks.iter().map(|s| s.as_ref()).collect();

            for (sink, result) in dispatch_all(&artifact, &sinks).await {
                deliveries.push(Delivery {
                    format: route.format,
                    sink,
                    result,
                });
            }
        }

        let outcome = RunOutcome { report, deliveries };
        let failed = outcome.failures().count();

        for d in outcome.failures() {
            if let Err(e) = &d.result {
                error!(sink = %d.sink, format = d.format.as_str(), error = %e, "delivery failed");
            }
        }

        info!(
            ok = outcome.report.entries().len() - outcome.report.missing_count(),
            missing = outcome.report.missing_count(),
            stale = outcome.report.suppressed().len(),
            delivered = outcome.deliveries.len() - failed,
            failed,
            "completed report run"
        );

        outcome
    }
}
