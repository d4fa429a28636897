//! Credentials: permission bitmask, bearer tokens and password hashing.

pub mod password;
pub mod permissions;
pub mod token;

pub use password::PasswordError;
pub use permissions::Permissions;
pub use token::TokenError;
