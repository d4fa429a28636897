//! Per-request deadline enforcement with response buffering.
//!
//! The downstream chain runs as its own task and produces a complete
//! [`BufferedResponse`]. The enforcer races that task against the deadline:
//!
//! ```text
//!            PENDING ──(task: full body buffered)───▶ STARTED   → flush buffer
//!               │
//!               └──(enforcer: deadline passed)──────▶ TIMED_OUT → 504, drop task output
//! ```
//!
//! Exactly one transition out of `PENDING` succeeds, so a client never sees
//! a 504 mixed with handler output. A body still streaming at the deadline
//! has not started, so it loses to the 504.
//!
//! # Cancellation
//!
//! The task is never aborted. When the deadline passes, the [`Deadline`]
//! stored in request extensions is cancelled; handlers that watch it can
//! stop early, handlers that do not keep running until they finish.
//!
//! ```rust,ignore
//! async fn slow(Extension(deadline): Extension<Deadline>) -> AppResult<Json<T>> {
//!     tokio::select! {
//!         result = expensive() => Ok(Json(result?)),
//!         () = deadline.cancelled() => Err(AppError::GatewayTimeout),
//!     }
//! }
//! ```

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::{Body, Bytes, to_bytes};
use axum::http::{HeaderMap, Request, Response, StatusCode};
use axum::response::IntoResponse;
use tokio::task::JoinError;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tower::{Layer, Service};
use tracing::{Instrument, debug, error, warn};

use crate::error::AppError;

/// Deadline used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

const PENDING: u8 = 0;
const STARTED: u8 = 1;
const TIMED_OUT: u8 = 2;

/// Who got to decide the response.
#[derive(Debug, Clone, Default)]
struct WriteState(Arc<AtomicU8>);

impl WriteState {
    fn transition(&self, to: u8) -> bool {
        self.0
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Deadline of the current request, readable by handlers.
#[derive(Debug, Clone)]
pub struct Deadline {
    token: CancellationToken,
    expires_at: Instant,
}

impl Deadline {
    fn new(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            expires_at: Instant::now() + timeout,
        }
    }

    /// Completes once the deadline has passed.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Complete downstream output captured before it is sent.
#[derive(Debug)]
pub struct BufferedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl BufferedResponse {
    /// Collect a response's body into memory.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the body stream fails.
    pub async fn capture(response: Response<Body>) -> Result<Self, AppError> {
        let (parts, body) = response.into_parts();
        let body = to_bytes(body, usize::MAX)
            .await
            .map_err(|e| AppError::Internal(format!("failed to buffer response body: {e}")))?;
        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}

impl IntoResponse for BufferedResponse {
    fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.headers_mut() = self.headers;
        *response.status_mut() = self.status;
        response
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeadlineLayer {
    timeout: Duration,
}

impl DeadlineLayer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for DeadlineLayer {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl<S> Layer<S> for DeadlineLayer {
    type Service = DeadlineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DeadlineService {
            inner,
            timeout: self.timeout,
        }
    }
}

#[derive(Clone)]
pub struct DeadlineService<S> {
    inner: S,
    timeout: Duration,
}

impl<S> Service<Request<Body>> for DeadlineService<S>
where
    S: Service<Request<Body>, Response = Response<Body>, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let timeout = self.timeout;
        let deadline = Deadline::new(timeout);
        let token = deadline.token.clone();
        let task_token = token.clone();
        req.extensions_mut().insert(deadline);

        let state = WriteState::default();
        let task_state = state.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut task = tokio::spawn(
                async move {
                    let response = match inner.call(req).await {
                        Ok(response) => response,
                        Err(never) => match never {},
                    };
                    let buffered = tokio::select! {
                        buffered = BufferedResponse::capture(response) => buffered,
                        () = task_token.cancelled() => {
                            debug!("Deadline passed while the response body was still streaming");
                            return None;
                        }
                    };
                    if !task_state.transition(STARTED) {
                        debug!("Discarding response produced after the deadline");
                        return None;
                    }
                    Some(buffered)
                }
                .in_current_span(),
            );

            tokio::select! {
                joined = &mut task => return Ok(flush(joined)),
                () = tokio::time::sleep(timeout) => {}
            }

            token.cancel();

            if state.transition(TIMED_OUT) {
                warn!(timeout_ms = timeout.as_millis() as u64, "Request exceeded deadline");
                return Ok(AppError::GatewayTimeout.into_response());
            }

            debug!("Deadline passed while the buffered response was being released");
            Ok(flush(task.await))
        })
    }
}

fn flush(joined: Result<Option<Result<BufferedResponse, AppError>>, JoinError>) -> Response<Body> {
    match joined {
        Ok(Some(Ok(buffered))) => buffered.into_response(),
        Ok(Some(Err(err))) => err.into_response(),
        // Only reachable when TIMED_OUT won, which never awaits the task
        Ok(None) => AppError::GatewayTimeout.into_response(),
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => {
            error!(error = %err, "Request task did not complete");
            AppError::Internal(format!("request task failed: {err}")).into_response()
        }
    }
}
