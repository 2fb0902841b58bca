mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, info};

use eventhub_api::checkout::FixedCheckout;
use eventhub_api::{AppState, AppStateInner};
use eventhub_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "eventhub=debug,eventhub_api=debug,eventhub_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path, &config.store)?;
    let seeded = db.seed_events(&config.seed_events)?;
    if seeded > 0 {
        info!("Seeded {} events", seeded);
    }
    debug!("my-events plan: {:?}", db.explain_my_events("")?);

    let state: AppState = Arc::new(AppStateInner {
        db,
        checkout: Box::new(FixedCheckout::new(config.checkout_total)),
    });

    let app = eventhub_api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("eventhub listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("eventhub stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
