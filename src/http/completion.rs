//! Response completion callbacks.
//!
//! The server drops a response body once its last frame has been written or
//! the client has gone away. Wrapping the body lets a probe run exactly once
//! at that point, after the handler has returned.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::response::Response;
use http_body::{Frame, SizeHint};

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Runs its callback when dropped.
struct OnClose(Option<Callback>);

impl Drop for OnClose {
    fn drop(&mut self) {
        if let Some(callback) = self.0.take() {
            callback();
        }
    }
}

/// A body that fires a callback when the server is done with it.
struct CompletionBody {
    inner: Body,
    _on_close: OnClose,
}

impl http_body::Body for CompletionBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Register `callback` to run once `response` has been sent or abandoned.
pub fn on_response_close<F>(response: Response, callback: F) -> Response
where
    F: FnOnce() + Send + 'static,
{
    let (parts, body) = response.into_parts();
    let body = CompletionBody {
        inner: body,
        _on_close: OnClose(Some(Box::new(callback))),
    };
    Response::from_parts(parts, Body::new(body))
}
