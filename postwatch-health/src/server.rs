//! Health check HTTP server.

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use postwatch_common::Signal;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{HealthChecker, HealthConfig, HealthError};

/// Upper bound on a whole request; individual CLI invocations carry their
/// own shorter timeout, this only caps pathological pile-ups.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Health check HTTP server.
///
/// Serves `/`, `/postfix` and `/status`; anything else is a JSON 404.
pub struct HealthServer {
    listener: TcpListener,
    router: Router,
}

impl HealthServer {
    /// Bind the listener and build the router.
    ///
    /// # Errors
    /// Returns [`HealthError::Bind`] if binding the address fails. This is
    /// the reporter's one fatal startup condition.
    pub async fn new(
        config: &HealthConfig,
        checker: Arc<HealthChecker>,
    ) -> Result<Self, HealthError> {
        let listener = TcpListener::bind(&config.listen_address)
            .await
            .map_err(|source| HealthError::Bind {
                address: config.listen_address.clone(),
                source,
            })?;

        tracing::info!(
            address = %config.listen_address,
            "health server bound successfully"
        );

        let router = Router::new()
            .route("/", get(root_handler))
            .route("/postfix", get(postfix_handler))
            .route("/status", get(status_handler))
            .fallback(fallback_handler)
            .with_state(checker)
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(TraceLayer::new_for_http());

        Ok(Self { listener, router })
    }

    /// Run the server until a shutdown signal is received.
    ///
    /// # Errors
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), HealthError> {
        tracing::info!("health server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("health server received shutdown signal");
            })
            .await
            .map_err(|e| HealthError::Server(e.to_string()))?;

        tracing::info!("health server stopped");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ServiceDescriptor {
    service: &'static str,
    endpoints: [&'static str; 2],
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    healthy: bool,
    timestamp: DateTime<Utc>,
    checks: ChecksResponse,
}

#[derive(Debug, Serialize)]
struct ChecksResponse {
    postfix_running: bool,
    postfix_queue_healthy: bool,
    config_valid: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Root endpoint: service descriptor.
async fn root_handler() -> Json<ServiceDescriptor> {
    Json(ServiceDescriptor {
        service: "postwatch-health",
        endpoints: ["/postfix", "/status"],
        timestamp: Utc::now(),
    })
}

/// Binary health endpoint for external monitors.
///
/// 200 when every check passes, 503 otherwise.
async fn postfix_handler(State(checker): State<Arc<HealthChecker>>) -> Response {
    let snapshot = checker.snapshot().await;

    let status = if snapshot.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        status: if snapshot.healthy {
            "OK"
        } else {
            "Service Unavailable"
        },
        healthy: snapshot.healthy,
        timestamp: Utc::now(),
        checks: ChecksResponse {
            postfix_running: snapshot.postfix_running,
            postfix_queue_healthy: snapshot.queue_healthy,
            config_valid: snapshot.config_valid,
        },
    };

    if !snapshot.healthy {
        tracing::warn!(
            postfix_running = snapshot.postfix_running,
            queue_healthy = snapshot.queue_healthy,
            config_valid = snapshot.config_valid,
            "health check failed"
        );
    }

    (status, Json(body)).into_response()
}

/// Verbose status endpoint for debugging. Always 200.
async fn status_handler(State(checker): State<Arc<HealthChecker>>) -> Response {
    Json(checker.status_report().await).into_response()
}

async fn fallback_handler() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorBody { error: "not found" })).into_response()
}
