//! Panic recovery.
//!
//! [`panic_guard`] turns a panic anywhere below it into a `500` JSON envelope
//! so one faulty request cannot take the connection down with it.
//! [`install_panic_hook`] records where the panic happened, with a stack trace,
//! before unwinding reaches the guard.

use std::any::Any;
use std::backtrace::Backtrace;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;

use crate::error::{ErrorBody, ErrorDetail};

/// Message returned to clients for any recovered panic.
pub const PANIC_MESSAGE: &str = "something went wrong";

pub type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// Layer that catches panics from inner services.
pub fn panic_guard() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(panic_response as PanicHandler)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    error!(panic = %panic_message(payload.as_ref()), "Panic recovered");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: ErrorDetail::Message(PANIC_MESSAGE),
        }),
    )
        .into_response()
}

/// Route panic reports through `tracing` with a captured stack trace.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            panic = %panic_message(info.payload()),
            location = %location,
            backtrace = %Backtrace::force_capture(),
            "Panic in request processing"
        );
    }));
}
