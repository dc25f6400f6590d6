//! Error type for the coordination-service boundary.

use thiserror::Error;

/// Errors surfaced by coordination primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    /// A node already exists at the requested path.
    #[error("node '{path}' already exists")]
    NodeExists {
        /// The conflicting path.
        path: String,
    },

    /// No node exists at the requested path.
    #[error("node '{path}' does not exist")]
    NoNode {
        /// The missing path.
        path: String,
    },

    /// The immediate parent of the requested path does not exist.
    #[error("parent path of '{path}' does not exist")]
    NoParent {
        /// The path whose parent is missing.
        path: String,
    },

    /// A conditional delete did not match the node's current version.
    #[error("version mismatch on '{path}': expected {expected}, actual {actual}")]
    VersionMismatch {
        /// The path of the node.
        path: String,
        /// The version the caller expected.
        expected: i64,
        /// The version the node actually carries.
        actual: i64,
    },

    /// The session is not currently connected.
    #[error("session is not connected")]
    NotConnected,

    /// The session has expired; all of its ephemeral state is gone.
    #[error("session has expired")]
    SessionExpired,

    /// The initial connection did not reach the service in time.
    #[error("connection timed out after {duration_ms}ms")]
    ConnectTimeout {
        /// Milliseconds waited before giving up.
        duration_ms: u64,
    },

    /// The request failed for a reason not attributable to protocol state.
    #[error("coordination request failed: {reason}")]
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_exists_display() {
        let err = CoordinationError::NodeExists {
            path: "/leader".to_string(),
        };
        assert_eq!(err.to_string(), "node '/leader' already exists");
    }

    #[test]
    fn no_node_display() {
        let err = CoordinationError::NoNode {
            path: "/peers/peer-0000000007".to_string(),
        };
        assert_eq!(err.to_string(), "node '/peers/peer-0000000007' does not exist");
    }

    #[test]
    fn no_parent_display() {
        let err = CoordinationError::NoParent {
            path: "/apps/peers".to_string(),
        };
        assert_eq!(err.to_string(), "parent path of '/apps/peers' does not exist");
    }

    #[test]
    fn version_mismatch_display() {
        let err = CoordinationError::VersionMismatch {
            path: "/leader".to_string(),
            expected: 4,
            actual: 9,
        };
        assert_eq!(err.to_string(), "version mismatch on '/leader': expected 4, actual 9");
    }

    #[test]
    fn connect_timeout_display() {
        let err = CoordinationError::ConnectTimeout { duration_ms: 5000 };
        assert_eq!(err.to_string(), "connection timed out after 5000ms");
    }

    #[test]
    fn error_equality() {
        let err1 = CoordinationError::SessionExpired;
        let err2 = CoordinationError::SessionExpired;
        let err3 = CoordinationError::NotConnected;

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
