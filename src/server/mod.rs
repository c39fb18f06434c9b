//! HTTP decision API
//!
//! Exposes the access gate to reverse proxies and other callers:
//!
//! - `POST /api/authorize` - decide a request (200 allowed, 403 denied)
//! - `GET /api/health` - liveness check
//! - `GET /api/metrics` - decision counters
//! - `POST /api/reload` - re-read the configuration and swap policies

pub mod metrics;
pub mod routes;

pub use metrics::{DecisionMetrics, MetricsSnapshot};
pub use routes::{ApiState, AuthorizeRequest, router};

use crate::error::ServerError;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// Default port for the decision API
pub const DEFAULT_HTTP_PORT: u16 = 9091;

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address to bind to (e.g., "127.0.0.1:9091")
    pub bind: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_HTTP_PORT)),
        }
    }
}

impl HttpConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self { bind }
    }

    /// Create config from host and port strings
    pub fn from_host_port(host: &str, port: u16) -> Result<Self, ServerError> {
        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        Ok(Self::new(addr))
    }
}

/// Run the decision API until Ctrl+C
pub async fn run_server(config: HttpConfig, state: ApiState) -> anyhow::Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(ServerError::from)?;
    info!("Decision API listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await
        .map_err(ServerError::from)?;

    info!("Decision API stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_default() {
        let config = HttpConfig::default();
        assert_eq!(config.bind.port(), DEFAULT_HTTP_PORT);
    }

    #[test]
    fn test_http_config_from_host_port() {
        let config = HttpConfig::from_host_port("0.0.0.0", 8080).unwrap();
        assert_eq!(config.bind.port(), 8080);

        assert!(matches!(
            HttpConfig::from_host_port("not-an-ip", 8080),
            Err(ServerError::Bind(_))
        ));
    }
}
