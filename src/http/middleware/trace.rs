//! Structured request traces for the request channel.
//!
//! # Responsibilities
//! - Buffer the request body (bounded) so it can be both traced and handled
//! - Snapshot the request, with route params filled in once the route matched
//! - Build and route the YAML document when the response closes
//!
//! # Design Decisions
//! - `trace_probe` sits outside the panic catcher and timeout, so a 500 or
//!   408 is traced like any other response
//! - `record_route_params` is a route layer; a request it never saw matched
//!   no route and is not traced
//! - An oversized body is rejected with 413 before the handler runs
//! - Nothing is snapshotted while the request channel is inactive

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, RawPathParams, State},
    http::{request, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use uuid::Uuid;

use crate::http::completion::on_response_close;
use crate::http::cookies::CookieSigner;
use crate::http::error::AppError;
use crate::http::request::RequestIdExt;
use crate::http::snapshot::{HandlerValue, RequestSnapshot, RequestTrace, ResponseSnapshot};
use crate::observability::{Channel, ChannelRouter};

pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct TraceProbe {
    router: ChannelRouter,
    signer: Option<CookieSigner>,
    max_body_bytes: usize,
}

impl TraceProbe {
    pub fn new(router: ChannelRouter, signer: Option<CookieSigner>, max_body_bytes: usize) -> Self {
        Self {
            router,
            signer,
            max_body_bytes,
        }
    }
}

/// Route params of the matched route; empty until the route layer runs.
#[derive(Debug, Clone, Default)]
struct MatchedRoute(Arc<Mutex<Option<BTreeMap<String, String>>>>);

impl MatchedRoute {
    fn set(&self, params: BTreeMap<String, String>) {
        *self.0.lock().unwrap_or_else(|p| p.into_inner()) = Some(params);
    }

    fn take(&self) -> Option<BTreeMap<String, String>> {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).take()
    }
}

async fn path_params(parts: &mut request::Parts) -> BTreeMap<String, String> {
    match RawPathParams::from_request_parts(parts, &()).await {
        Ok(params) => params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        Err(_) => BTreeMap::new(),
    }
}

/// Route layer: marks the request as matched and records its path params.
pub async fn record_route_params(req: Request<Body>, next: Next) -> Response {
    let Some(matched) = req.extensions().get::<MatchedRoute>().cloned() else {
        return next.run(req).await;
    };
    let (mut parts, body) = req.into_parts();
    matched.set(path_params(&mut parts).await);
    next.run(Request::from_parts(parts, body)).await
}

pub async fn trace_probe(State(probe): State<TraceProbe>, req: Request<Body>, next: Next) -> Response {
    if !probe.router.is_active(Channel::Request) {
        return next.run(req).await;
    }

    let start = Instant::now();
    let started_at = Utc::now();

    let (mut parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, probe.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, limit = probe.max_body_bytes, "Request body rejected");
            return AppError::payload_too_large(probe.max_body_bytes).into_response();
        }
    };

    let id = parts
        .headers
        .request_id()
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let remote = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let mut request =
        RequestSnapshot::capture(&parts, BTreeMap::new(), &bytes, remote, probe.signer.as_ref());
    let matched = MatchedRoute::default();
    parts.extensions.insert(matched.clone());

    let mut response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    let Some(params) = matched.take() else {
        return response;
    };
    request.params = params;
    let value = response.extensions_mut().remove::<HandlerValue>();
    let status = response.status();
    let headers = response.headers().clone();
    let TraceProbe { router, signer, .. } = probe;

    on_response_close(response, move || {
        let response = ResponseSnapshot::capture(status, &headers, value, signer.as_ref());
        let trace = RequestTrace::new(id, started_at, start.elapsed(), request, response);
        match trace.to_yaml() {
            Ok(document) => router.route(Channel::Request, document),
            Err(e) => tracing::debug!(error = %e, "Request trace serialization failed"),
        }
    })
}
