use anyhow::{Context, Result, bail};
use chrono::Utc;
use chrono_tz::America::New_York;
use reporter::{Pipeline, config::Config};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Nothing touches the network until the configuration is complete.
    let config = Config::from_env().context("invalid configuration")?;
    let pipeline = Pipeline::from_config(&config)?;

    let today = Utc::now().with_timezone(&New_York).date_naive();
    let outcome = pipeline.run(today).await;

    let failed = outcome.failures().count();
    if failed > 0 {
        bail!("{failed} of {} deliveries failed", outcome.deliveries.len());
    }

    info!("Run complete.");
    Ok(())
}
