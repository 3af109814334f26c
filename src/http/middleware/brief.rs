//! One-line request summaries for the brief channel.
//!
//! Line format: `METHOD URL STATUS - REMOTE - ELAPSEDms`, where URL keeps the
//! query string and REMOTE is `-` when the peer address is unknown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::completion::on_response_close;
use crate::http::snapshot::format_elapsed;
use crate::observability::{Channel, ChannelRouter};

/// Paths that never produce a brief line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionList {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl ExclusionList {
    pub fn new(exact: Vec<String>, prefixes: Vec<String>) -> Self {
        Self { exact, prefixes }
    }

    /// Matched against the path only; the query string is ignored.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exact.iter().any(|p| p == path) || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

impl Default for ExclusionList {
    fn default() -> Self {
        Self {
            exact: vec!["/ping".to_string(), "/assets".to_string()],
            prefixes: vec!["/assets/".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct BriefProbe {
    router: ChannelRouter,
    exclusions: Arc<ExclusionList>,
}

impl BriefProbe {
    pub fn new(router: ChannelRouter, exclusions: ExclusionList) -> Self {
        Self {
            router,
            exclusions: Arc::new(exclusions),
        }
    }
}

pub fn brief_line(
    method: &Method,
    url: &str,
    status: StatusCode,
    remote: Option<&str>,
    elapsed: Duration,
) -> String {
    format!(
        "{} {} {} - {} - {}",
        method,
        url,
        status.as_u16(),
        remote.unwrap_or("-"),
        format_elapsed(elapsed)
    )
}

pub async fn brief_probe(State(probe): State<BriefProbe>, req: Request<Body>, next: Next) -> Response {
    if !probe.router.is_active(Channel::Brief) {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let url = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let response = next.run(req).await;

    if method == Method::OPTIONS || probe.exclusions.is_excluded(&path) {
        return response;
    }

    let status = response.status();
    let router = probe.router;
    on_response_close(response, move || {
        let line = brief_line(&method, &url, status, remote.as_deref(), start.elapsed());
        router.route(Channel::Brief, line);
    })
}
