//! Static file server for the public page bundle.
//!
//! Serves the pages, rewrites path-style program links to the query
//! form, and answers unmatched paths with an HTML 404 page.
//!
//! ```rust,ignore
//! use daana_client::site::{SiteConfig, serve};
//!
//! serve(SiteConfig::from_env()?).await?;
//! ```

mod config;
mod error;
mod routes;

pub use config::{DEFAULT_PORT, SiteConfig};
pub use error::SiteError;
pub use routes::router;

use tokio::net::TcpListener;
use tokio::signal;

/// Binds the configured address and serves until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns [`SiteError::Io`] if the listener cannot be bound or the server fails.
pub async fn serve(config: SiteConfig) -> Result<(), SiteError> {
    let app = router(config.root());
    let address = config.address();

    let listener = TcpListener::bind(address).await?;
    tracing::info!(
        address = %address,
        root = %config.root().display(),
        "Site server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Site server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
