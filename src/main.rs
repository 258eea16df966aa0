//! Binary entry point: load `.env`, set up logging, run the relay.

use sharelink_relay::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    let default_filter = if config.api.debug {
        "sharelink_relay=debug,tower_http=debug"
    } else {
        "sharelink_relay=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        gateway = %config.resolver.base_url,
        staging = %config.transfer.staging_dir.display(),
        max_file_size_mb = config.transfer.max_file_size_mb,
        "Starting sharelink-relay"
    );

    sharelink_relay::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
