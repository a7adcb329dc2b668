//! # tickerlens web
//!
//! Browser dashboard and JSON API over [`tickerlens_core`].
//!
//! Each visitor gets an [`AnalysisSession`](tickerlens_core::AnalysisSession)
//! selected by the `tickerlens_session` cookie, so caches and rate gates are
//! never shared between visitors. Invalid input maps to 422; missing market
//! data is an empty-state panel with status 200.

pub mod app;
pub mod error;
pub mod page;
pub mod routes;
pub mod state;

pub use app::create_app;
pub use error::{ApiError, ApiResult};
pub use state::{AppState, SessionFactory, SessionLease};

use tickerlens_core::{AppConfig, ConfigError};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Serves the dashboard on `config.addr` until the process is stopped.
pub async fn serve(config: AppConfig) -> Result<(), ServeError> {
    let addr = config.addr.clone();
    let state = AppState::new(config)?;
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServeError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!(addr = %addr, "dashboard listening");
    let app = create_app(state);
    axum::serve(listener, app).await?;
    Ok(())
}
