//! Strict JSON request bodies.
//!
//! [`JsonBody`] accepts exactly one JSON value of at most [`MAX_BODY_BYTES`],
//! rejects unknown keys (via `deny_unknown_fields` on the target type) and
//! turns decoder failures into client-facing messages that never mention
//! Rust type names.

use axum::body::{Bytes, to_bytes};
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::{AppError, AppResult};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// Extractor that decodes the request body with [`decode`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let bytes = to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| read_error(&e))?;
        decode(&bytes).map(JsonBody)
    }
}

fn read_error(err: &axum::Error) -> AppError {
    // The limit error is private to http-body-util; its message is stable
    let mut source: Option<&dyn std::error::Error> = Some(err);
    while let Some(e) = source {
        if e.to_string().contains("length limit exceeded") {
            return AppError::BadRequest(format!(
                "body must not be larger than {MAX_BODY_BYTES} bytes"
            ));
        }
        source = e.source();
    }
    AppError::BadRequest("body could not be read".to_string())
}

/// Decode a single JSON value from `bytes`.
///
/// # Errors
///
/// Returns `AppError::BadRequest` with a message describing the first problem.
pub fn decode<T: DeserializeOwned>(bytes: &Bytes) -> AppResult<T> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("body must not be empty".to_string()));
    }

    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value = T::deserialize(&mut de).map_err(|e| AppError::BadRequest(describe(&e)))?;
    de.end().map_err(|_| {
        AppError::BadRequest("body must only contain a single JSON object".to_string())
    })?;

    Ok(value)
}

fn describe(e: &serde_json::Error) -> String {
    let (line, column) = (e.line(), e.column());
    match e.classify() {
        Category::Syntax => {
            format!("body contains badly-formed JSON (at line {line} column {column})")
        }
        Category::Eof => "body contains badly-formed JSON".to_string(),
        Category::Data => {
            let msg = e.to_string();
            if let Some(key) = backticked(&msg, "unknown field `") {
                format!("body contains unknown key \"{key}\"")
            } else if let Some(key) = backticked(&msg, "missing field `") {
                format!("body is missing key \"{key}\"")
            } else {
                format!("body contains incorrect JSON type (at line {line} column {column})")
            }
        }
        Category::Io => "body could not be read".to_string(),
    }
}

/// Text between `prefix` and the next backtick in `msg`.
fn backticked<'a>(msg: &'a str, prefix: &str) -> Option<&'a str> {
    let start = msg.find(prefix)? + prefix.len();
    let rest = msg.get(start..)?;
    rest.find('`').and_then(|end| rest.get(..end))
}
