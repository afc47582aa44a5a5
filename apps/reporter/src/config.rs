use std::env::var;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowUrls {
    pub handshake_url: String,
    pub data_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub webhook_url: String,
    pub fred_api_key: String,
    pub quote_api_base: String,
    pub fred_api_base: String,
    pub flow: Option<FlowUrls>,
    pub output_dir: PathBuf,
    pub provider_timeout: Duration,
    pub run_deadline: Duration,
    pub webhook_max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| var(key).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let flow = match (get("FLOW_HANDSHAKE_URL"), get("FLOW_DATA_URL")) {
            (Some(handshake_url), Some(data_url)) => Some(FlowUrls {
                handshake_url,
                data_url,
            }),
            (None, None) => None,
            // One without the other leaves the session handshake unusable.
            (Some(value), None) => {
                return Err(ConfigError::Invalid {
                    var: "FLOW_HANDSHAKE_URL",
                    value,
                });
            }
            (None, Some(value)) => {
                return Err(ConfigError::Invalid {
                    var: "FLOW_DATA_URL",
                    value,
                });
            }
        };

        let webhook_url = required("SLACK_WEBHOOK_URL")?;
        if !(webhook_url.starts_with("https://") || webhook_url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                var: "SLACK_WEBHOOK_URL",
                value: webhook_url,
            });
        }

        Ok(Self {
            webhook_url,
            fred_api_key: required("FRED_API_KEY")?,
            quote_api_base: get("QUOTE_API_BASE_URL")
                .unwrap_or_else(|| "https://query1.finance.yahoo.com".to_string()),
            fred_api_base: get("FRED_API_BASE_URL")
                .unwrap_or_else(|| "https://api.stlouisfed.org".to_string()),
            flow,
            output_dir: get("REPORT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            provider_timeout: Duration::from_secs(parse_or(&get, "PROVIDER_TIMEOUT_SECS", 15)?),
            run_deadline: Duration::from_secs(parse_or(&get, "RUN_DEADLINE_SECS", 60)?),
            webhook_max_attempts: parse_or(&get, "WEBHOOK_MAX_ATTEMPTS", 1)?,
        })
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join("market_summary.txt")
    }

    pub fn data_path(&self) -> PathBuf {
        self.output_dir.join("market_data.json")
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) if v > T::default() => Ok(v),
            _ => Err(ConfigError::Invalid {
                var: key,
                value: raw,
            }),
        },
    }
}
