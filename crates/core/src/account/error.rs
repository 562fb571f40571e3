//! Account error types.

use creditship_shared::ErrorCategory;
use creditship_shared::types::AccountId;
use thiserror::Error;

use crate::access::Role;
use crate::auth::PasswordError;
use crate::store::StoreError;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Malformed input.
    #[error("invalid account data: {0}")]
    Validation(String),

    /// Unknown email or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The account is deactivated.
    #[error("account {0} is inactive")]
    Inactive(AccountId),

    /// The actor's role cannot provision the requested role.
    #[error("role {role} may not create {requested} accounts")]
    RoleNotPermitted {
        /// Actor role.
        role: Role,
        /// Requested role.
        requested: Role,
    },

    /// Account is outside the actor's scope.
    #[error("account {0} is outside your scope")]
    OutOfScope(AccountId),

    /// Account is visible but not managed by the actor.
    #[error("account {0} is not managed by you")]
    NotManaged(AccountId),

    /// Account not found.
    #[error("account not found: {0}")]
    NotFound(AccountId),

    /// Email already registered.
    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    /// Password hashing failed.
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Storage failure.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(what) => Self::DuplicateEmail(what),
            other => Self::Store(other),
        }
    }
}

impl AccountError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Inactive(_) => "ACCOUNT_INACTIVE",
            Self::RoleNotPermitted { .. } => "ROLE_NOT_PERMITTED",
            Self::OutOfScope(_) => "OUT_OF_SCOPE",
            Self::NotManaged(_) => "TARGET_NOT_MANAGED",
            Self::NotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::DuplicateEmail(_) => "DUPLICATE_EMAIL",
            Self::Password(_) => "INTERNAL_ERROR",
            Self::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Failure category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::InvalidCredentials
            | Self::Inactive(_)
            | Self::RoleNotPermitted { .. }
            | Self::OutOfScope(_)
            | Self::NotManaged(_) => ErrorCategory::Authorization,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::DuplicateEmail(_) => ErrorCategory::Conflict,
            Self::Password(_) | Self::Store(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        if self.is_authentication_failure() {
            return 401;
        }
        self.category().status_code()
    }

    /// Returns true if the caller could not be authenticated.
    #[must_use]
    pub const fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::Inactive(_))
    }
}
