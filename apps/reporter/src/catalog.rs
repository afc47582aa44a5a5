//! The fixed set of items a daily report asks for.

use chrono::Duration;
use market::{FlowEndpoint, Indicator, Instrument, Unit};

use crate::config::FlowUrls;

pub const MARKET_INDICES: &str = "Market Indices";
pub const MAJOR_STOCKS: &str = "Major Stocks";
pub const ECONOMIC_INDICATORS: &str = "Economic Indicators";
pub const INSTITUTIONAL_FLOWS: &str = "Institutional Flows";

const VOLATILITY_SYMBOL: &str = "^VIX";

const INDICES: [(&str, &str); 4] = [
    ("^GSPC", "S&P 500"),
    ("^DJI", "Dow Jones"),
    ("^IXIC", "NASDAQ"),
    ("^VIX", "VIX"),
];

const STOCKS: [(&str, &str); 4] = [
    ("AAPL", "Apple"),
    ("MSFT", "Microsoft"),
    ("AMZN", "Amazon"),
    ("GOOGL", "Google"),
];

pub fn instruments() -> Vec<Instrument> {
    let indices = INDICES.iter().map(|(symbol, label)| {
        let instrument = Instrument::new(*symbol, *label, MARKET_INDICES);
        if *symbol == VOLATILITY_SYMBOL {
            instrument.volatility_gauge()
        } else {
            instrument
        }
    });
    let stocks = STOCKS
        .iter()
        .map(|(symbol, label)| Instrument::new(*symbol, *label, MAJOR_STOCKS));

    indices.chain(stocks).collect()
}

/// Daily series publish on business days, so their window spans a weekend.
/// Weekly claims are dated to the Saturday before a Thursday release.
pub fn indicators() -> Vec<Indicator> {
    vec![
        Indicator::new("DGS10", "10Y Treasury", ECONOMIC_INDICATORS, Unit::Percent, Duration::days(4)),
        Indicator::new("DFF", "Fed Funds Rate", ECONOMIC_INDICATORS, Unit::Percent, Duration::days(4)),
        Indicator::new("T10Y2Y", "10Y-2Y Spread", ECONOMIC_INDICATORS, Unit::Percent, Duration::days(4)),
        Indicator::new("DCOILWTICO", "WTI Crude", ECONOMIC_INDICATORS, Unit::Price, Duration::days(7)),
        Indicator::new("ICSA", "Initial Jobless Claims", ECONOMIC_INDICATORS, Unit::Level, Duration::days(12)),
    ]
}

pub fn flow_endpoint(urls: &FlowUrls) -> FlowEndpoint {
    FlowEndpoint {
        handshake_url: urls.handshake_url.clone(),
        data_url: urls.data_url.clone(),
        label: "Investor Flows".to_string(),
        group: INSTITUTIONAL_FLOWS.to_string(),
        categories: vec!["foreign".to_string(), "institutional".to_string()],
    }
}
