//! Binary entrypoint for the leaf node server.
//!
//! Configuration comes from the environment, see [`leaf_server::config`].
//! Log filtering follows `RUST_LOG` (default: `info`).

use tracing_subscriber::EnvFilter;

use leaf_server::config::ServerConfig;
use leaf_server::router::build_router;
use leaf_server::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let state = AppState::new(&config.db_path)?;
    let app = build_router(state);

    let addr = config.listen_addr();
    tracing::info!(db_path = %config.db_path, "leaf node starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
