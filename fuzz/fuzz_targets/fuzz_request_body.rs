//! Fuzz testing for request body decoding and validation.
//!
//! Feeds arbitrary bytes through the strict JSON decoder and, when a body
//! decodes, through the matching validator. Neither step may panic; every
//! failure must surface as an `AppError`.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_request_body -- -max_total_time=60
//! ```

#![no_main]

use axum::body::Bytes;
use libfuzzer_sys::fuzz_target;
use issue_tracker::json::decode;
use issue_tracker::models::{
    CreateIssueRequest, LoginRequest, RegisterRequest, UpdateStatusRequest,
};
use issue_tracker::validation::{
    password_problems, validate_issue, validate_login, validate_registration, validate_status,
};

fuzz_target!(|data: &[u8]| {
    let body = Bytes::copy_from_slice(data);

    if let Ok(req) = decode::<RegisterRequest>(&body) {
        let _ = validate_registration(&req);
    }
    if let Ok(req) = decode::<LoginRequest>(&body) {
        let _ = validate_login(&req);
    }
    if let Ok(req) = decode::<CreateIssueRequest>(&body) {
        let _ = validate_issue(&req);
    }
    if let Ok(req) = decode::<UpdateStatusRequest>(&body) {
        let _ = validate_status(&req.status);
    }

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = password_problems(s);
    }
});
