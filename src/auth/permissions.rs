//! Permission bitmask carried inside bearer tokens.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Bitmask of capabilities granted to a user.
///
/// Serialized as a plain integer both in JSON bodies and in token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(i32);

impl Permissions {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(1);
    pub const WRITE: Self = Self(2);
    pub const ADMIN: Self = Self(4);
    /// Granted to every newly registered user.
    pub const DEFAULT: Self = Self(Self::READ.0 | Self::WRITE.0);
    pub const ALL: Self = Self(Self::READ.0 | Self::WRITE.0 | Self::ADMIN.0);

    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> i32 {
        self.0
    }

    /// True iff every bit of `required` is set.
    pub const fn has(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }
}

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
