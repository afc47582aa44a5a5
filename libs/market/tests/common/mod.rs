#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as Days, NaiveDate};
use market::freshness::Freshness;
use market::model::{CategoryFlow, FlowSnapshot};
use market::{
    FlowEndpoint, FlowSource, IndicatorSource, MissingReason, Observation, Payload, QuoteSource,
    SourceResult, Unit,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

//
// Loopback HTTP responder
//

#[derive(Debug, Clone)]
pub struct Stub {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl Stub {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

type Routes = Arc<Mutex<HashMap<String, VecDeque<Stub>>>>;

/// Serves queued responses per path. The last queued response for a path
/// repeats; unknown paths get a 404.
pub struct MockHttp {
    pub base: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockHttp {
    pub async fn start(routes: Vec<(&str, Vec<Stub>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let routes: Routes = Arc::new(Mutex::new(
            routes
                .into_iter()
                .map(|(path, stubs)| (path.to_string(), stubs.into_iter().collect()))
                .collect(),
        ));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let _ = handle(stream, routes, log).await;
                });
            }
        });

        Self {
            base: format!("http://{addr}"),
            requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn handle(
    mut stream: TcpStream,
    routes: Routes,
    log: Arc<Mutex<Vec<Recorded>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target.clone(), String::new()),
    };

    let stub = {
        let mut routes = routes.lock().unwrap();
        match routes.get_mut(&path) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        }
    }
    .unwrap_or_else(|| Stub::new(404, ""));

    log.lock().unwrap().push(Recorded {
        method,
        path,
        query,
        headers,
        body,
    });

    let reason = match stub.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };

    let mut response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        stub.status,
        reason,
        stub.body.len()
    );
    for (name, value) in &stub.headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str("\r\n");
    response.push_str(&stub.body);

    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

//
// Fake providers
//

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

#[derive(Debug, Clone)]
pub enum Behavior {
    Ok { latest: f64, previous: f64 },
    Missing(MissingReason),
    Hang,
    Panic,
}

fn observation(as_of: NaiveDate, latest: f64, previous: f64, unit: Unit) -> Observation {
    Observation::new((as_of, latest), (as_of - Days::days(1), previous), unit).unwrap()
}

async fn jitter(max_ms: u64) {
    if max_ms > 0 {
        tokio::time::sleep(Duration::from_millis(fastrand::u64(0..=max_ms))).await;
    }
}

#[derive(Default)]
pub struct FakeQuotes {
    table: HashMap<String, Behavior>,
    jitter_ms: u64,
}

impl FakeQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: &str, behavior: Behavior) -> Self {
        self.table.insert(symbol.to_string(), behavior);
        self
    }

    pub fn jitter(mut self, max_ms: u64) -> Self {
        self.jitter_ms = max_ms;
        self
    }
}

#[async_trait]
impl QuoteSource for FakeQuotes {
    async fn fetch(&self, symbol: &str, _lookback: Days) -> SourceResult {
        jitter(self.jitter_ms).await;

        match self.table.get(symbol) {
            Some(Behavior::Ok { latest, previous }) => SourceResult::Ok(Payload::Observation(
                observation(today() - Days::days(1), *latest, *previous, Unit::Price),
            )),
            Some(Behavior::Missing(reason)) => SourceResult::Missing(*reason),
            Some(Behavior::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                SourceResult::Missing(MissingReason::RequestFailed)
            }
            Some(Behavior::Panic) => panic!("provider blew up for {symbol}"),
            None => SourceResult::Missing(MissingReason::InsufficientData),
        }
    }
}

/// Series keyed by id: (days before today of the latest release, latest, previous).
#[derive(Default)]
pub struct FakeIndicators {
    table: HashMap<String, (i64, f64, f64)>,
    jitter_ms: u64,
}

impl FakeIndicators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, series_id: &str, age_days: i64, latest: f64, previous: f64) -> Self {
        self.table
            .insert(series_id.to_string(), (age_days, latest, previous));
        self
    }

    pub fn jitter(mut self, max_ms: u64) -> Self {
        self.jitter_ms = max_ms;
        self
    }
}

#[async_trait]
impl IndicatorSource for FakeIndicators {
    async fn fetch(&self, series_id: &str, freshness: Freshness, unit: Unit) -> SourceResult {
        jitter(self.jitter_ms).await;

        match self.table.get(series_id) {
            Some((age, latest, previous)) => {
                let as_of = freshness.today - Days::days(*age);
                freshness.gate(observation(as_of, *latest, *previous, unit))
            }
            None => SourceResult::Missing(MissingReason::BadResponse),
        }
    }
}

pub struct FakeFlows {
    snapshot: Option<FlowSnapshot>,
}

impl FakeFlows {
    pub fn missing() -> Self {
        Self { snapshot: None }
    }

    pub fn with(categories: &[(&str, f64, f64)]) -> Self {
        Self {
            snapshot: Some(FlowSnapshot {
                period: today() - Days::days(1),
                categories: categories
                    .iter()
                    .map(|(name, buy, sell)| CategoryFlow {
                        category: name.to_string(),
                        buy: *buy,
                        sell: *sell,
                    })
                    .collect(),
            }),
        }
    }
}

#[async_trait]
impl FlowSource for FakeFlows {
    async fn fetch(&self, _endpoint: &FlowEndpoint) -> SourceResult {
        match &self.snapshot {
            Some(s) => SourceResult::Ok(Payload::Flow(s.clone())),
            None => SourceResult::Missing(MissingReason::BadResponse),
        }
    }
}

pub fn flow_endpoint(base: &str) -> FlowEndpoint {
    FlowEndpoint {
        handshake_url: format!("{base}/session"),
        data_url: format!("{base}/flows"),
        label: "Investor Flows".to_string(),
        group: "Institutional Flows".to_string(),
        categories: vec!["foreign".to_string(), "institutional".to_string()],
    }
}

/// Parses the numbers out of a rendered text line such as
/// `A: 20.00 UP ↑ +2.00 (+11.11%)` into (value, absolute, percent).
pub fn parse_text_line(text: &str, label: &str) -> Option<(f64, f64, Option<f64>)> {
    let prefix = format!("{label}: ");
    let line = text.lines().find(|l| l.starts_with(&prefix))?;
    let tokens: Vec<&str> = line[prefix.len()..].split_whitespace().collect();

    let number = |s: &str| -> Option<f64> {
        s.trim_matches(|c| c == '(' || c == ')' || c == '%')
            .replace(',', "")
            .parse()
            .ok()
    };

    let value = number(tokens.first()?)?;
    let absolute = number(tokens.get(3)?)?;
    let percent = tokens.get(4).and_then(|t| number(t));
    Some((value, absolute, percent))
}
