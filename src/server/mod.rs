//! Router construction and server host for the gateway.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::Request,
    routing::{post, MethodRouter},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Span};

use crate::config::Config;
use crate::error::Result;
use crate::paths::PathResolver;
use crate::processing::{OperationExecutor, ParameterValidator};

pub mod errors;
pub mod handlers;
pub mod response;

pub use errors::ApiError;

/// Dependencies shared by every handler; nothing in here is mutable
#[derive(Debug)]
pub struct AppState {
    pub resolver: PathResolver,
    pub executor: OperationExecutor,
    pub validator: ParameterValidator,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_executor(config, OperationExecutor::new(config))
    }

    /// Build state around a caller-provided executor (custom transcoders, tests)
    pub fn with_executor(config: &Config, executor: OperationExecutor) -> Result<Self> {
        Ok(Self {
            resolver: PathResolver::new(&config.paths)?,
            executor,
            validator: ParameterValidator::from_config(&config.processing),
        })
    }
}

/// Axum router wrapper hosting the three operation routes
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::from_state(AppState::new(config)?))
    }

    pub fn from_state(state: AppState) -> Self {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );

        let router = Router::new()
            .route("/resize", post_only(handlers::resize))
            .route("/convert", post_only(handlers::convert))
            .route("/compress", post_only(handlers::compress))
            .fallback(handlers::not_found)
            .layer(trace_layer)
            .with_state(Arc::new(state));

        Self { router }
    }

    /// The fully layered router
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind `addr` and serve until Ctrl-C
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Server stopped");
        Ok(())
    }
}

fn post_only<H, T>(handler: H) -> MethodRouter<Arc<AppState>>
where
    H: axum::handler::Handler<T, Arc<AppState>>,
    T: 'static,
{
    post(handler).fallback(handlers::method_not_allowed)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
