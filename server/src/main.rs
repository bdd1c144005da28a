use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use ticketing_server::auth::spawn_session_sweeper;
use ticketing_server::config::Config;
use ticketing_server::routes::create_routes;
use ticketing_server::store::{MemoryStore, PgStore, Store};
use ticketing_server::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => Arc::new(PgStore::connect(url, config.max_connections).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    spawn_session_sweeper(
        store.clone(),
        Duration::from_secs(config.session_sweep_secs),
    );

    let addr = config.socket_addr();
    let app: Router = create_routes(AppState::new(store, config));

    tracing::info!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
