//! Decision API handlers

use crate::access_control::{Level, Resource, Subject};
use crate::config::load_config;
use crate::error::ServerError;
use crate::gate::{AccessGate, AccessOutcome, AccessRequest};
use crate::server::metrics::{DecisionMetrics, MetricsSnapshot};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub gate: Arc<AccessGate>,
    pub metrics: Arc<DecisionMetrics>,
    /// Configuration file re-read on reload; `None` uses the default lookup
    pub config_path: Option<String>,
}

impl ApiState {
    pub fn new(gate: Arc<AccessGate>, config_path: Option<String>) -> Self {
        Self {
            gate,
            metrics: Arc::new(DecisionMetrics::new()),
            config_path,
        }
    }
}

/// Body of `POST /api/authorize`
///
/// The resource is given either as the original `url` or as `domain` and
/// `path`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeRequest {
    pub url: Option<String>,
    pub domain: Option<String>,
    pub path: Option<String>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub level: Level,
    pub ip: Option<IpAddr>,
}

impl AuthorizeRequest {
    /// Convert into a gate request
    pub fn into_access_request(self) -> Result<AccessRequest, ServerError> {
        let resource = match (self.url, self.domain) {
            (Some(url), _) => Resource::from_url(&url).ok_or_else(|| {
                ServerError::InvalidRequest(format!("cannot extract a domain from '{}'", url))
            })?,
            (None, Some(domain)) if !domain.is_empty() => {
                Resource::new(domain, self.path.unwrap_or_else(|| "/".to_string()))
            }
            _ => {
                return Err(ServerError::InvalidRequest(
                    "either 'url' or 'domain' is required".to_string(),
                ));
            }
        };

        let subject = Subject {
            user: self.user,
            groups: self.groups,
            level: self.level,
        };

        let mut request = AccessRequest::new(resource, subject);
        request.client_ip = self.ip;
        Ok(request)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ReloadBody {
    reloaded: bool,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Build the API router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/authorize", post(authorize))
        .route("/api/health", get(health))
        .route("/api/metrics", get(metrics))
        .route("/api/reload", post(reload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Decide a request: 200 when allowed, 403 when denied
async fn authorize(
    State(state): State<ApiState>,
    Json(body): Json<AuthorizeRequest>,
) -> Response {
    let request = match body.into_access_request() {
        Ok(request) => request,
        Err(e) => {
            state.metrics.record_rejected();
            warn!(error = %e, "Rejected authorization request");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let outcome: AccessOutcome = state.gate.evaluate(&request);
    state
        .metrics
        .record_decision(outcome.allowed, outcome.recognized_user.is_some());

    let status = if outcome.allowed {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    };
    (status, Json(outcome)).into_response()
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn metrics(State(state): State<ApiState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Re-read the configuration and swap the policies in
async fn reload(State(state): State<ApiState>) -> Response {
    let result = load_config(state.config_path.as_deref())
        .and_then(|config| state.gate.reload(&config));

    match result {
        Ok(()) => {
            state.metrics.record_reload();
            info!("Configuration reloaded through the API");
            Json(ReloadBody { reloaded: true }).into_response()
        }
        Err(e) => {
            error!(error = %e, "Configuration reload failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ServerError::Reload(e.to_string()).to_string(),
            )
        }
    }
}
