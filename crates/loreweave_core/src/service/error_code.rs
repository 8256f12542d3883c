//! Caller-facing failure taxonomy shared by every service.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Coarse error class exposed across the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced node or link target is missing.
    NotFound,
    /// Input rejected before any write.
    Validation,
    /// Actor is neither owner nor admin.
    Forbidden,
    /// Unexpected storage failure.
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::Forbidden => "FORBIDDEN",
            Self::Internal => "INTERNAL",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
