mod api;
mod app;
mod auth;
mod bidding;
mod config;
mod db;
mod domain;
mod error;
mod logging;
mod middleware;
mod routes;
mod services;
mod store;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use bidding::{seed::seed_tenders, Clock, DeadlineSweeper, ProposalRanker, SystemClock};
use services::PdfRenderer;
use store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting tender desk backend"
    );

    // Persistence: Postgres when configured, otherwise process memory
    let store: Arc<dyn Store> = match &settings.database_url {
        Some(url) => {
            let pool = db::create_pool(&settings, url).await?;
            let pg = PgStore::new(pool);
            pg.migrate().await?;
            tracing::info!("Database migrations applied");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Create application state
    let state = app::AppState::new(
        settings.clone(),
        store.clone(),
        clock.clone(),
        Arc::new(PdfRenderer::new()),
    );

    if settings.seed_catalog {
        state.catalog.seed(seed_tenders(clock.now())).await?;
    }

    if settings.ranking_sweep_interval_seconds > 0 {
        let sweeper = Arc::new(DeadlineSweeper::new(
            store.clone(),
            clock.clone(),
            ProposalRanker::new(store, clock),
        ));
        sweeper.spawn(Duration::from_secs(settings.ranking_sweep_interval_seconds));
        tracing::info!(
            interval_seconds = settings.ranking_sweep_interval_seconds,
            "Deadline sweeper started"
        );
    }

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
