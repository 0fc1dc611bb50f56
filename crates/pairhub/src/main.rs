//! Pairhub server binary.
//!
//! Listens on `PAIRHUB_ADDR` (default `0.0.0.0:8080`). Log verbosity
//! follows `RUST_LOG`, defaulting to `info`.

use pairhub::{PairhubError, PairhubServer};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<(), PairhubError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr =
        std::env::var("PAIRHUB_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());

    let server = PairhubServer::builder().bind(&addr).build().await?;
    if let Ok(local) = server.local_addr() {
        tracing::info!(%local, "listening");
    }

    server.run_until(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("ctrl-c received");
}
