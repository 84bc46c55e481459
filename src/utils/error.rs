//! Error Handling
//!
//! Service-level error taxonomy for the identity subsystem. Every operation
//! surfaces one of these kinds plus a human-readable message; persistence and
//! email internals are logged at the conversion point and never forwarded to
//! the caller.

use thiserror::Error;

use crate::service::email::EmailError;
use crate::store::StoreError;

/// Errors returned by the identity services
#[derive(Error, Debug)]
pub enum AuthError {
    /// Malformed or unacceptable input
    #[error("Validation error: {0}")]
    Validation(String),

    /// No such user or token
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate email, phone number, license or tax id on create
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Token or code past its expiry; the stale record has been removed
    #[error("Expired: {0}")]
    Expired(String),

    /// Wrong password, OTP or token value; no side effect, retry allowed
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Account state forbids the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Credential store or email dispatch failure
    #[error("Dependency error: {0}")]
    Dependency(String),
}

impl AuthError {
    /// Stable machine-readable kind for callers that map errors to a wire
    /// format.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::Conflict(_) => "CONFLICT",
            AuthError::Expired(_) => "EXPIRED",
            AuthError::InvalidCredential(_) => "INVALID_CREDENTIAL",
            AuthError::Forbidden(_) => "FORBIDDEN",
            AuthError::Dependency(_) => "DEPENDENCY_ERROR",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(field) => {
                AuthError::Conflict(format!("{} already in use", field))
            }
            StoreError::Database(e) => {
                log::error!("credential store failure: {}", e);
                AuthError::Dependency("credential store unavailable".to_string())
            }
        }
    }
}

impl From<bcrypt::BcryptError> for AuthError {
    fn from(err: bcrypt::BcryptError) -> Self {
        log::error!("password hashing failure: {}", err);
        AuthError::Dependency("password hashing failed".to_string())
    }
}

impl From<EmailError> for AuthError {
    fn from(err: EmailError) -> Self {
        log::error!("email dispatch failure: {}", err);
        AuthError::Dependency("email could not be delivered".to_string())
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(err: validator::ValidationErrors) -> Self {
        AuthError::Validation(format!("invalid request data: {}", err))
    }
}

/// Result type alias for identity service operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_unique_violation_maps_to_conflict() {
        let err: AuthError = StoreError::UniqueViolation("email".to_string()).into();
        assert!(matches!(err, AuthError::Conflict(_)));
        assert_eq!(err.kind(), "CONFLICT");
    }

    #[test]
    fn store_database_error_hides_detail() {
        let err: AuthError = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        match err {
            AuthError::Dependency(msg) => assert_eq!(msg, "credential store unavailable"),
            other => panic!("expected Dependency, got {:?}", other),
        }
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(AuthError::Expired("code".to_string()).kind(), "EXPIRED");
        assert_eq!(
            AuthError::InvalidCredential("nope".to_string()).kind(),
            "INVALID_CREDENTIAL"
        );
    }
}
