mod flow_client;
mod indicator_client;
mod price_client;

pub mod aggregator;
pub mod change;
pub mod dispatch;
pub mod freshness;
pub mod model;
pub mod render;
pub mod source;

pub use aggregator::{Aggregator, Settings};
pub use change::{ChangeResult, Direction};
pub use dispatch::{DispatchError, FileSink, Sink, WebhookSink, dispatch, dispatch_all};
pub use flow_client::{FlowClient, FlowPeriod, latest_snapshot};
pub use freshness::Freshness;
pub use indicator_client::IndicatorClient;
pub use model::{
    Entry, FlowEndpoint, Indicator, Instrument, MissingReason, Observation, Payload, Report,
    SourceResult, Unit,
};
pub use price_client::PriceClient;
pub use render::{Format, RenderedArtifact, render, render_all};
pub use source::{FlowSource, IndicatorSource, QuoteSource};
