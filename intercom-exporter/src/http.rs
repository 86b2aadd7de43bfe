//! HTTP server for the `/metrics` and `/probe` endpoints.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::probe::{ProbeQuery, ProbeRequest, Prober};
use crate::registry::{CONTENT_TYPE, SharedMetrics};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    metrics: SharedMetrics,
    prober: Prober,
}

/// Basic auth credentials gating every route.
type SharedCredentials = Arc<(String, String)>;

/// Create the HTTP router.
pub fn create_router(
    metrics: SharedMetrics,
    prober: Prober,
    credentials: Option<(String, String)>,
) -> Router {
    let state = AppState { metrics, prober };

    let mut router = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/probe", get(probe_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    if let Some(credentials) = credentials {
        router = router.layer(middleware::from_fn_with_state(
            Arc::new(credentials),
            basic_auth_middleware,
        ));
    }

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn exposition(body: String) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}

fn render_failed(err: std::fmt::Error) -> Response {
    error!(error = %err, "Failed to render metrics");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "failed to render metrics\n",
    )
        .into_response()
}

/// Handler for the /metrics endpoint: the global registry.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.global().render() {
        Ok(body) => exposition(body),
        Err(e) => render_failed(e),
    }
}

/// Handler for the /probe endpoint: a request-scoped registry.
///
/// Missing parameters and unusable targets are a `400`. Probe failures
/// still answer `200`, with `probe_success` set to 0.
async fn probe_handler(State(state): State<AppState>, Query(query): Query<ProbeQuery>) -> Response {
    let params = match query.require() {
        Ok(params) => params,
        Err(e) if e.is_client_error() => {
            debug!(error = %e, "Rejected probe request");
            return (StatusCode::BAD_REQUEST, format!("{}\n", e)).into_response();
        }
        Err(e) => {
            error!(error = %e, "Unexpected probe parameter error");
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("{}\n", e)).into_response();
        }
    };

    let target = params.url.clone();

    let outcome = match ProbeRequest::try_from(params) {
        Ok(request) => state.prober.run(&request).await,
        Err(e) if e.is_client_error() => {
            debug!(error = %e, "Rejected probe request");
            return (StatusCode::BAD_REQUEST, format!("{}\n", e)).into_response();
        }
        Err(e) => {
            warn!(target = %target, error = %e, "Probe rejected");
            Err(e)
        }
    };

    let scoped = state.metrics.new_scoped();

    match outcome {
        Ok(result) => state.metrics.record_success(&scoped, &target, &result),
        Err(_) => state.metrics.record_failure(&scoped, &target),
    }

    let rendered = scoped.render();
    scoped.discard();

    match rendered {
        Ok(body) => exposition(body),
        Err(e) => render_failed(e),
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

async fn basic_auth_middleware(
    State(credentials): State<SharedCredentials>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok());

    let authorized = provided
        .as_deref()
        .and_then(|pair| pair.split_once(':'))
        .is_some_and(|(user, pass)| user == credentials.0 && pass == credentials.1);

    if !authorized {
        warn!(path = %path, "auth failed");
        return Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header(header::WWW_AUTHENTICATE, "Basic realm=\"intercom-exporter\"")
            .body(Body::from("Unauthorized\n"))
            .unwrap_or_else(|_| StatusCode::UNAUTHORIZED.into_response());
    }

    next.run(request).await
}

/// HTTP server configuration.
pub struct HttpServer {
    metrics: SharedMetrics,
    prober: Prober,
    listen_addr: String,
    credentials: Option<(String, String)>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(
        metrics: SharedMetrics,
        prober: Prober,
        listen_addr: String,
        credentials: Option<(String, String)>,
    ) -> Self {
        Self {
            metrics,
            prober,
            listen_addr,
            credentials,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let auth_enabled = self.credentials.is_some();
        let router = create_router(self.metrics, self.prober, self.credentials);

        let listener = tokio::net::TcpListener::bind(&self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(
            addr = %self.listen_addr,
            auth = auth_enabled,
            "HTTP server listening"
        );

        // Run server with graceful shutdown
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
