//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the diagnostic handlers
//! - Wire up telemetry middleware around any set of routes
//! - Bind server to listener and stop on the shutdown signal
//!
//! # Design Decisions
//! - Layer order, outermost first: tower trace, request id, request trace,
//!   request id propagation, error boundary, brief probe, panic catcher, timeout
//! - The request trace wraps propagation so traced response headers carry the id
//! - `with_telemetry` is public so any router gets the same instrumentation

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::http::cookies::CookieSigner;
use crate::http::error::{handle_panic, not_found, report_unhandled, AppError};
use crate::http::middleware::{
    brief_probe, record_route_params, trace_probe, BriefProbe, ExclusionList, TraceProbe,
};
use crate::http::request::{propagate_request_id_layer, request_id_layer};
use crate::http::snapshot::Traced;
use crate::lifecycle::shutdown::wait_for;
use crate::observability::ChannelRouter;

/// Everything the telemetry layers need, built once from config.
#[derive(Debug, Clone)]
pub struct Telemetry {
    router: ChannelRouter,
    brief: BriefProbe,
    trace: TraceProbe,
    request_timeout: Duration,
}

impl Telemetry {
    pub fn from_config(router: ChannelRouter, config: &AppConfig) -> Self {
        let signer = config.cookies.secret.as_deref().and_then(|secret| {
            CookieSigner::new(secret)
                .map_err(|e| tracing::warn!(error = %e, "Cookie secret rejected"))
                .ok()
        });
        let exclusions = ExclusionList::new(
            config.logging.excluded_paths.clone(),
            config.logging.excluded_prefixes.clone(),
        );

        Self {
            brief: BriefProbe::new(router.clone(), exclusions),
            trace: TraceProbe::new(router.clone(), signer, config.logging.max_body_bytes),
            router,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        }
    }

    pub fn router(&self) -> &ChannelRouter {
        &self.router
    }
}

/// Wrap `routes` with the telemetry and error layers.
#[allow(deprecated)]
pub fn with_telemetry(routes: Router, telemetry: &Telemetry) -> Router {
    routes
        .route_layer(from_fn(record_route_params))
        .fallback(not_found)
        .layer(TimeoutLayer::new(telemetry.request_timeout))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn_with_state(telemetry.brief.clone(), brief_probe))
        .layer(from_fn_with_state(telemetry.router.clone(), report_unhandled))
        .layer(propagate_request_id_layer())
        .layer(from_fn_with_state(telemetry.trace.clone(), trace_probe))
        .layer(request_id_layer())
        .layer(TraceLayer::new_for_http())
}

/// The diagnostic routes.
pub fn routes() -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/status", get(status))
        .route("/echo/{name}", post(echo))
}

/// HTTP server hosting the diagnostic routes.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    pub fn new(config: AppConfig, logger: ChannelRouter) -> Self {
        let telemetry = Telemetry::from_config(logger, &config);
        let router = with_telemetry(routes(), &telemetry);
        Self { router, config }
    }

    /// The fully layered router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain open connections.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[derive(Debug, Serialize)]
struct StatusBody {
    version: &'static str,
    status: &'static str,
}

async fn ping() -> &'static str {
    "pong"
}

async fn status() -> Traced<StatusBody> {
    Traced(StatusBody {
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}

#[derive(Debug, Serialize)]
struct EchoBody {
    name: String,
    query: BTreeMap<String, String>,
    body: Value,
}

async fn echo(
    Path(name): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> Result<Traced<EchoBody>, AppError> {
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::bad_request(e.to_string()))?
    };
    Ok(Traced(EchoBody { name, query, body }))
}
