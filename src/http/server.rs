//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, per-route deadlines, body limits, request ID)
//! - Record per-route request metrics
//! - Bind server to listener and serve until shutdown

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::chain::ChainApi;
use crate::config::ServerConfig;
use crate::http::handlers::{self, AppState};
use crate::observability::metrics;
use crate::registry::DappRegistry;
use crate::staking::StakingService;

/// HTTP server for the staking API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    pub fn new<C: ChainApi, R: DappRegistry>(
        config: &ServerConfig,
        service: Arc<StakingService<C, R>>,
    ) -> Self {
        Self {
            router: build_router(config, service),
        }
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
///
/// Reads and registration get separate deadlines; registration waits for
/// finalization and needs the longer one.
pub fn build_router<C: ChainApi, R: DappRegistry>(
    config: &ServerConfig,
    service: Arc<StakingService<C, R>>,
) -> Router {
    let state = AppState { service };
    let read_timeout = Duration::from_secs(config.request_timeout_secs);
    let register_timeout = Duration::from_secs(config.register_timeout_secs);

    let reads = Router::new()
        .route("/health", get(handlers::health::<C, R>))
        .route(
            "/api/v1/{network}/dapps-staking/apr",
            get(handlers::apr::<C, R>),
        )
        .route(
            "/api/v1/{network}/dapps-staking/apy",
            get(handlers::apy::<C, R>),
        )
        .route(
            "/api/v1/{network}/dapps-staking/tvl",
            get(handlers::tvl::<C, R>),
        )
        .route(
            "/api/v1/{network}/dapps-staking/next-era-eta",
            get(handlers::next_era_eta::<C, R>),
        )
        .route(
            "/api/v1/{network}/dapps-staking/dapps/{address}",
            get(handlers::get_dapp::<C, R>),
        )
        .route(
            "/api/v1/{network}/token/stats",
            get(handlers::token_stats::<C, R>),
        )
        .route_layer(middleware::from_fn_with_state(read_timeout, enforce_timeout));

    let writes = Router::new()
        .route(
            "/api/v1/{network}/dapps-staking/register",
            post(handlers::register_dapp::<C, R>),
        )
        .route_layer(middleware::from_fn_with_state(register_timeout, enforce_timeout));

    reads
        .merge(writes)
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Answer 500 once `limit` elapses, dropping the handler future.
async fn enforce_timeout(State(limit): State<Duration>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(path = %path, timeout_secs = limit.as_secs(), "Request timed out");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Request timed out after {} seconds", limit.as_secs()),
            )
                .into_response()
        }
    }
}

async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16(), start);
    response
}
