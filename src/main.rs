use anyhow::Context;
use tracing_subscriber::EnvFilter;

use seabird_discord_backend::backend::Backend;
use seabird_discord_backend::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let backend = Backend::new(&config).await.context("failed to construct discord backend")?;
    backend.run().await.context("discord backend exited with an error")
}
