//! Request trace documents.
//!
//! # Responsibilities
//! - Snapshot the request before the handler runs
//! - Snapshot the response, including the handler's returned value
//! - Serialize the whole trace as one YAML document
//!
//! # Design Decisions
//! - Handlers opt in to value capture by returning [`Traced`]; the value is
//!   tapped into a response extension so the probe never re-parses the body
//! - Maps are `BTreeMap` so documents are stable across runs

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Query,
    http::{header, request, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::http::cookies::{parse_cookie_header, parse_set_cookies, CookieMap, CookieSigner};
use crate::http::error::AppError;

/// Unsigned cookie values; absent when no cookie secret is configured.
pub type UnsignedCookies = Option<BTreeMap<String, Option<String>>>;

/// A handler's return value, as seen by the full probe.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerValue(pub Value);

/// JSON responder that also exposes its value to the request trace.
#[derive(Debug, Clone)]
pub struct Traced<T>(pub T);

impl<T: Serialize> IntoResponse for Traced<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.0) {
            Ok(value) => {
                let mut response = Json(value.clone()).into_response();
                response.extensions_mut().insert(HandlerValue(value));
                response
            }
            Err(e) => AppError::from(e).into_response(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TraceTiming {
    /// RFC 3339 UTC timestamp of the request start.
    pub utc: String,
    pub response_time: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RequestSnapshot {
    pub ip: Option<String>,
    pub method: String,
    pub protocol: String,
    pub hostname: Option<String>,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub url: String,
    pub params: BTreeMap<String, String>,
    pub body: Value,
    pub cookies: CookieMap,
    pub unsigned_cookies: UnsignedCookies,
    pub headers: BTreeMap<String, String>,
}

impl RequestSnapshot {
    pub fn capture(
        parts: &request::Parts,
        params: BTreeMap<String, String>,
        body: &Bytes,
        remote: Option<SocketAddr>,
        signer: Option<&CookieSigner>,
    ) -> Self {
        let protocol = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.scheme_str())
            .unwrap_or("http")
            .to_string();
        let hostname = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()));
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!(
            "{}://{}{}",
            protocol,
            hostname.as_deref().unwrap_or_default(),
            path_and_query
        );
        let cookies = parse_cookie_header(&parts.headers);
        let unsigned_cookies = signer.map(|s| s.unsign_all(&cookies));

        Self {
            ip: remote.map(|addr| addr.ip().to_string()),
            method: parts.method.to_string(),
            protocol,
            hostname,
            path: parts.uri.path().to_string(),
            query: parse_query(&parts.uri),
            url,
            params,
            body: body_value(&parts.headers, body),
            cookies,
            unsigned_cookies,
            headers: header_map(&parts.headers),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ResponseSnapshot {
    pub status: String,
    pub status_text: Option<String>,
    pub data: Option<Value>,
    pub data_type: &'static str,
    pub cookies: CookieMap,
    pub unsigned_cookies: UnsignedCookies,
    pub headers: BTreeMap<String, String>,
}

impl ResponseSnapshot {
    pub fn capture(
        status: StatusCode,
        headers: &HeaderMap,
        value: Option<HandlerValue>,
        signer: Option<&CookieSigner>,
    ) -> Self {
        let cookies = parse_set_cookies(headers);
        let unsigned_cookies = signer.map(|s| s.unsign_all(&cookies));
        let data = value.map(|v| v.0);

        Self {
            status: status.as_u16().to_string(),
            status_text: status_text(status),
            data_type: data_type(data.as_ref()),
            data,
            cookies,
            unsigned_cookies,
            headers: header_map(headers),
        }
    }
}

/// One request/response exchange.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RequestTrace {
    pub id: String,
    pub time: TraceTiming,
    pub request: RequestSnapshot,
    pub response: ResponseSnapshot,
}

impl RequestTrace {
    pub fn new(
        id: impl Into<String>,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        request: RequestSnapshot,
        response: ResponseSnapshot,
    ) -> Self {
        Self {
            id: id.into(),
            time: TraceTiming {
                utc: started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                response_time: format_elapsed(elapsed),
            },
            request,
            response,
        }
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Milliseconds with two decimals, e.g. `12.34ms`.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.2}ms", elapsed.as_secs_f64() * 1000.0)
}

/// Type tag of the handler value, named the way JavaScript's `typeof` does.
pub fn data_type(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Null | Value::Array(_) | Value::Object(_)) => "object",
    }
}

/// Canonical reason phrase in `SCREAMING_SNAKE_CASE`, e.g. `NOT_FOUND`.
pub fn status_text(status: StatusCode) -> Option<String> {
    status
        .canonical_reason()
        .map(|reason| reason.to_uppercase().replace(['-', ' '], "_").replace('\'', ""))
}

fn parse_query(uri: &Uri) -> BTreeMap<String, String> {
    Query::<BTreeMap<String, String>>::try_from_uri(uri)
        .map(|Query(q)| q)
        .unwrap_or_default()
}

fn body_value(headers: &HeaderMap, body: &Bytes) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json"));
    if is_json {
        if let Ok(value) = serde_json::from_slice(body) {
            return value;
        }
    }
    match std::str::from_utf8(body) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => Value::String(format!("<{} bytes>", body.len())),
    }
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    map
}
