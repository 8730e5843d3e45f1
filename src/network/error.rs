//! Service Errors
//!
//! Every request failure maps onto one status code of the response
//! envelope. Nothing here ever tears down a connection.

use thiserror::Error;

use crate::core::id::IdError;
use crate::game::play::PlayError;
use crate::network::protocol::{status, Response};
use crate::network::store::StoreError;

/// Request-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchpadError {
    /// Malformed payload or unknown game type.
    #[error("{0}")]
    Validation(String),

    /// Missing or unknown user identifier.
    #[error("unauthorized")]
    Unauthorized,

    /// Action not allowed in the current state.
    #[error("{0}")]
    Forbidden(String),

    /// Unknown game.
    #[error("{0}")]
    NotFound(String),

    /// Server-side failure.
    #[error("{0}")]
    Internal(String),
}

impl LaunchpadError {
    /// Envelope status code.
    pub fn status(&self) -> u16 {
        match self {
            LaunchpadError::Validation(_) => status::BAD_REQUEST,
            LaunchpadError::Unauthorized => status::UNAUTHORIZED,
            LaunchpadError::Forbidden(_) => status::FORBIDDEN,
            LaunchpadError::NotFound(_) => status::NOT_FOUND,
            LaunchpadError::Internal(_) => status::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error envelope.
    pub fn to_response(&self) -> Response {
        Response::error(self.status(), self.to_string())
    }
}

impl From<PlayError> for LaunchpadError {
    fn from(e: PlayError) -> Self {
        LaunchpadError::Forbidden(e.to_string())
    }
}

impl From<StoreError> for LaunchpadError {
    fn from(e: StoreError) -> Self {
        LaunchpadError::NotFound(e.to_string())
    }
}

impl From<IdError> for LaunchpadError {
    fn from(e: IdError) -> Self {
        LaunchpadError::Internal(e.to_string())
    }
}
