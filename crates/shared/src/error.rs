//! Failure taxonomy shared by every domain error.

use serde::Serialize;

/// Failure taxonomy shared by every domain error.
///
/// The category decides the HTTP status and whether a caller may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed request or row. Never touches the ledger.
    Validation,
    /// The actor may not see or affect the resource.
    Authorization,
    /// A balance is too low for the requested movement.
    InsufficientFunds,
    /// The carrier was unreachable or rejected the call.
    External,
    /// The resource is in a state that forbids the operation.
    Conflict,
    /// The carrier charged but the local ledger write did not commit.
    Reconciliation,
    /// Resource does not exist.
    NotFound,
    /// Storage or unexpected failure.
    Internal,
}

impl ErrorCategory {
    /// Returns the HTTP status code for this category.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::InsufficientFunds => 402,
            Self::Authorization => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::External => 502,
            Self::Reconciliation | Self::Internal => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_status_codes() {
        assert_eq!(ErrorCategory::Validation.status_code(), 400);
        assert_eq!(ErrorCategory::InsufficientFunds.status_code(), 402);
        assert_eq!(ErrorCategory::Authorization.status_code(), 403);
        assert_eq!(ErrorCategory::NotFound.status_code(), 404);
        assert_eq!(ErrorCategory::Conflict.status_code(), 409);
        assert_eq!(ErrorCategory::External.status_code(), 502);
        assert_eq!(ErrorCategory::Reconciliation.status_code(), 500);
        assert_eq!(ErrorCategory::Internal.status_code(), 500);
    }
}
