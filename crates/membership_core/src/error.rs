//! crates/membership_core/src/error.rs
//!
//! The error taxonomy shared by every core service.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The action needs a signed-in identity.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Signed in, but lacking the admin or ownership right for the action.
    #[error("Not allowed: {0}")]
    AuthorizationDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A required field is missing or malformed. Raised before any store call.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Transient store or network failure. Reads may be retried, writes are not.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl From<PortError> for ServiceError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => ServiceError::NotFound(what),
            PortError::Unauthorized => {
                ServiceError::AuthorizationDenied("rejected by the store".to_string())
            }
            PortError::Unexpected(msg) => ServiceError::BackendUnavailable(msg),
            PortError::Conflict(msg) => ServiceError::Validation(msg),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
