//! Field validation for request bodies.
//!
//! Each `validate_*` function trims its input, collects every failing field
//! into one map, and returns the cleaned values only when the map is empty.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{CreateIssueRequest, IssueStatus, LoginRequest, RegisterRequest};

// =============================================================================
// Validation Constants
// =============================================================================

/// Maximum length for user names and issue titles, in characters.
pub const MAX_TEXT_LENGTH: usize = 255;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 20;

/// Characters that satisfy the special character rule.
pub const PASSWORD_SPECIALS: &str = "!@#$%^&*";

static EMAIL_RE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
});

/// Registration fields after trimming and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
}

fn finish<T>(errors: FieldErrors, value: T) -> AppResult<T> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Problem with an already trimmed email, if any.
pub fn email_problem(email: &str) -> Option<&'static str> {
    if email.is_empty() {
        return Some("must enter an email");
    }
    match EMAIL_RE.as_ref() {
        Ok(re) if re.is_match(email) => None,
        _ => Some("not a valid email"),
    }
}

/// Password rules not met, in a fixed order. Empty when the password is acceptable.
pub fn password_problems(password: &str) -> Vec<&'static str> {
    let length = password.chars().count();
    let mut missing = Vec::new();

    if length < MIN_PASSWORD_LENGTH {
        missing.push("at least 8 characters");
    }
    if length > MAX_PASSWORD_LENGTH {
        missing.push("20 characters or fewer");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        missing.push("one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        missing.push("one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("one number");
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        missing.push("one special character (!@#$%^&*)");
    }

    missing
}

pub fn validate_registration(req: &RegisterRequest) -> AppResult<Registration> {
    let email = req.email.trim();
    let name = req.name.trim();
    let password = req.password.trim();
    let mut errors = FieldErrors::new();

    if let Some(problem) = email_problem(email) {
        errors.insert("email".into(), problem.into());
    }

    if name.is_empty() {
        errors.insert("name".into(), "must enter a name".into());
    } else if name.chars().count() > MAX_TEXT_LENGTH {
        errors.insert("name".into(), "must be shorter than 255 characters".into());
    }

    if password.is_empty() {
        errors.insert("password".into(), "must enter a password".into());
    } else {
        let missing = password_problems(password);
        if !missing.is_empty() {
            errors.insert(
                "password".into(),
                format!("must contain: {}", missing.join(", ")),
            );
        }
    }

    finish(
        errors,
        Registration {
            email: email.to_string(),
            name: name.to_string(),
            password: password.to_string(),
        },
    )
}

/// Only the email is checked; a wrong password is an authentication failure.
pub fn validate_login(req: &LoginRequest) -> AppResult<Credentials> {
    let email = req.email.trim();
    let mut errors = FieldErrors::new();

    if let Some(problem) = email_problem(email) {
        errors.insert("email".into(), problem.into());
    }

    finish(
        errors,
        Credentials {
            email: email.to_string(),
            password: req.password.clone(),
        },
    )
}

pub fn validate_issue(req: &CreateIssueRequest) -> AppResult<IssueDraft> {
    let title = req.title.trim();
    let mut errors = FieldErrors::new();

    if title.is_empty() {
        errors.insert("title".into(), "must not be blank".into());
    } else if title.chars().count() > MAX_TEXT_LENGTH {
        errors.insert("title".into(), "must not be more than 255 characters".into());
    }

    finish(
        errors,
        IssueDraft {
            title: title.to_string(),
            description: req.description.clone(),
        },
    )
}

pub fn validate_status(raw: &str) -> AppResult<IssueStatus> {
    raw.parse().map_err(|()| {
        AppError::field(
            "status",
            "must be one of: Incomplete, In-Progress, Complete",
        )
    })
}
