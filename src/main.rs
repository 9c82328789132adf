//! TopRest Commerce - storefront and back-office API

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use toprest_commerce::config::AppConfig;
use toprest_commerce::http::{router, AppState};
use toprest_commerce::services::EventBus;
use toprest_commerce::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::debug!(?config, "loaded configuration");

    let db = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, domain events will not be published");
                None
            }
        },
        None => None,
    };

    let state = AppState {
        store: Arc::new(PgStore::new(db)),
        events: EventBus::new(nats),
        base_domain: config.storefront_base_domain.clone(),
    };
    let app = router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    let addr = config.socket_addr();
    tracing::info!(%addr, "TopRest commerce listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
