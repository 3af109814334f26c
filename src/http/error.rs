//! HTTP error boundary.
//!
//! # Responsibilities
//! - Normalize every failure into `{code, description, errors?}`
//! - Carry unexpected failures (and handler panics) to the error channel
//! - Record request counters once the final status is known
//!
//! # Design Decisions
//! - `AppError` is a closed enum, matched exhaustively into a response
//! - Any `std::error::Error` converts into `AppError::Unknown`, so handlers use `?`
//! - The unhandled details ride in a response extension; the client only sees code 0
//!
//! # Data Flow
//! ```text
//! handler Err(AppError) / panic (CatchPanicLayer)
//!     → IntoResponse: status + ErrorBody, UnhandledError in extensions
//!     → report_unhandled: take extension → error channel
//! ```

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::observability::metrics;
use crate::observability::{Channel, ChannelRouter};

/// Application error codes exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    UnresolvedError = 0,
    ValidationFailed = 1,
    PayloadTooLarge = 2,
}

impl ApiErrorCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn description(self) -> &'static str {
        match self {
            ApiErrorCode::UnresolvedError => "Unresolved Error",
            ApiErrorCode::ValidationFailed => "Validation Failed",
            ApiErrorCode::PayloadTooLarge => "Payload Too Large",
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl ErrorBody {
    fn new(code: ApiErrorCode, errors: Option<Vec<String>>) -> Self {
        Self {
            code: code.code(),
            description: code.description().to_string(),
            errors,
        }
    }
}

/// Details of a failure nobody anticipated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledError {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl UnhandledError {
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let mut stack = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            stack.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            stack.push(backtrace.to_string());
        }

        Self {
            name: std::any::type_name::<E>().to_string(),
            message: error.to_string(),
            stack: (!stack.is_empty()).then(|| stack.join("\n")),
        }
    }

    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        Self {
            name: "panic".to_string(),
            message,
            stack: None,
        }
    }

    /// Error-channel body: name, message, then the stack when present.
    pub fn to_log_body(&self) -> String {
        match &self.stack {
            Some(stack) => format!("{}: {}\n{}", self.name, self.message, stack),
            None => format!("{}: {}", self.name, self.message),
        }
    }
}

/// Every failure a handler can return.
#[derive(Debug)]
pub enum AppError {
    /// A plain HTTP failure with a human readable message.
    Http { status: StatusCode, message: String },
    /// A failure with an application error code.
    Api {
        status: StatusCode,
        code: ApiErrorCode,
        errors: Option<Vec<String>>,
    },
    Unknown(UnhandledError),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::Api {
            status: StatusCode::BAD_REQUEST,
            code: ApiErrorCode::ValidationFailed,
            errors: Some(vec![message.into()]),
        }
    }

    pub fn payload_too_large(limit: usize) -> Self {
        AppError::Api {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            code: ApiErrorCode::PayloadTooLarge,
            errors: Some(vec![format!("request body exceeds {} bytes", limit)]),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Http { status, .. } | AppError::Api { status, .. } => *status,
            AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<E> From<E> for AppError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        AppError::Unknown(UnhandledError::from_error(&error))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Http { message, .. } => (
                status,
                Json(ErrorBody::new(ApiErrorCode::UnresolvedError, Some(vec![message]))),
            )
                .into_response(),
            AppError::Api { code, errors, .. } => {
                (status, Json(ErrorBody::new(code, errors))).into_response()
            }
            AppError::Unknown(unhandled) => {
                let mut response =
                    (status, Json(ErrorBody::new(ApiErrorCode::UnresolvedError, None)))
                        .into_response();
                response.extensions_mut().insert(unhandled);
                response
            }
        }
    }
}

/// Response for a handler panic caught by `CatchPanicLayer`.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    AppError::Unknown(UnhandledError::from_panic(payload)).into_response()
}

/// Fallback for unmatched routes.
pub async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::Http {
        status: StatusCode::NOT_FOUND,
        message: format!("Cannot {} {}", method, uri.path()),
    }
}

/// Routes unhandled failures to the error channel and counts the request.
pub async fn report_unhandled(
    State(router): State<ChannelRouter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().clone();

    let mut response = next.run(req).await;
    metrics::record_request(method.as_str(), response.status().as_u16(), start);

    if let Some(unhandled) = response.extensions_mut().remove::<UnhandledError>() {
        tracing::debug!(name = %unhandled.name, "Unhandled error reached the boundary");
        router.route(Channel::Error, unhandled.to_log_body());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> ErrorBody {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[derive(Debug, thiserror::Error)]
    #[error("disk on fire")]
    struct DiskError;

    #[tokio::test]
    async fn test_http_error_shape() {
        let response = AppError::Http {
            status: StatusCode::FORBIDDEN,
            message: "nope".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_of(response).await;
        assert_eq!(body.code, 0);
        assert_eq!(body.description, "Unresolved Error");
        assert_eq!(body.errors, Some(vec!["nope".to_string()]));
    }

    #[tokio::test]
    async fn test_api_error_shape() {
        let response = AppError::bad_request("name is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_of(response).await;
        assert_eq!(body.code, 1);
        assert_eq!(body.description, "Validation Failed");
        assert_eq!(body.errors, Some(vec!["name is required".to_string()]));
    }

    #[tokio::test]
    async fn test_unknown_error_hides_details() {
        let err: AppError = DiskError.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let unhandled = response.extensions().get::<UnhandledError>().cloned().unwrap();
        assert!(unhandled.name.ends_with("DiskError"));
        assert_eq!(unhandled.message, "disk on fire");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("disk on fire"));
        assert!(!text.contains("errors"));
        assert!(text.contains("\"code\":0"));
    }

    #[test]
    fn test_from_panic_payloads() {
        let err = UnhandledError::from_panic(Box::new("boom"));
        assert_eq!(err.message, "boom");
        let err = UnhandledError::from_panic(Box::new(String::from("owned boom")));
        assert_eq!(err.message, "owned boom");
        assert_eq!(err.to_log_body(), "panic: owned boom");
    }

    #[tokio::test]
    async fn test_not_found_message() {
        let err = not_found(Method::DELETE, Uri::from_static("/missing?x=1")).await;
        let body = body_of(err.into_response()).await;
        assert_eq!(body.errors, Some(vec!["Cannot DELETE /missing".to_string()]));
    }
}
