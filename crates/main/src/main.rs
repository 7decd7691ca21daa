use std::sync::Arc;

use db::config::AppConfig;
use raffle::{make_rocket, sync::Services};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // errors are only reported when a DSN is configured
    let sentry_guard = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                traces_sample_rate: 0.2,
                ..Default::default()
            },
        ))
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "raffle=info,db=info,rocket=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_guard.is_some().then(sentry_tracing::layer))
        .init();

    let config: AppConfig = rocket::Config::figment().extract()?;
    info!(
        public_base_url = %config.public_base_url,
        remote_store = config.store_url.is_some(),
        "configuration loaded"
    );

    let services = Arc::new(Services::from_config(config)?);
    make_rocket(services).launch().await?;
    Ok(())
}
