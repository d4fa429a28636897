//! Shared utilities for handlers.

use crate::error::{AppError, AppResult};

/// Parse an issue id from a path segment.
///
/// Any non-integer (including overflow) is a client error.
pub fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| AppError::BadRequest("id must be a number".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
    }

    #[test]
    fn test_parse_invalid_ids() {
        for raw in ["abc", "", "1.5", "99999999999999999999"] {
            assert!(matches!(
                parse_id(raw),
                Err(AppError::BadRequest(ref m)) if m == "id must be a number"
            ));
        }
    }
}
