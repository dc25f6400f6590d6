//! Error types for the election protocol.

use bellwether_core::CoordinationError;
use snafu::Snafu;

/// Errors from the election engine.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ElectionError {
    /// The session never reached the connected state in time.
    #[snafu(display("connection timed out after {duration_ms}ms"))]
    ConnectTimeout {
        /// Milliseconds waited before giving up.
        duration_ms: u64,
    },

    /// The coordination session expired; all ephemeral state is gone.
    #[snafu(display("coordination session expired"))]
    SessionExpired,

    /// Underlying coordination-service error.
    #[snafu(display("coordination error: {source}"))]
    Coordination {
        /// The underlying error.
        source: CoordinationError,
    },

    /// The engine loop is no longer running.
    #[snafu(display("election engine is no longer running"))]
    EngineStopped,
}

impl From<CoordinationError> for ElectionError {
    fn from(source: CoordinationError) -> Self {
        match source {
            CoordinationError::SessionExpired => ElectionError::SessionExpired,
            CoordinationError::ConnectTimeout { duration_ms } => ElectionError::ConnectTimeout { duration_ms },
            other => ElectionError::Coordination { source: other },
        }
    }
}
