use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bibliomerge::infrastructure::AppState;
use bibliomerge::{config, db, server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bibliomerge=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    if config.credentials.aladin_ttbkey.is_none() {
        tracing::warn!("ALADIN_TTBKEY is not set: lookup endpoints will answer 500");
    }

    // Cover cache storage
    let db = db::init_db(&config.database_url).await.map_err(|e| {
        tracing::error!("Failed to initialize database: {}", e);
        e
    })?;

    let port = config.port;
    let state = AppState::new(config, db)?;

    server::serve(state, port).await?;
    Ok(())
}
