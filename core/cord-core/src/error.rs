//! Error types for cord-core operations.
//! Keep CordFfiError minimal and stable to avoid breaking FFI clients.

use cord_ipc_protocol::FrameError;

// ═══════════════════════════════════════════════════════════════════════════════
// FFI-Compatible Error (for Swift/Kotlin/Python)
// ═══════════════════════════════════════════════════════════════════════════════

/// FFI-safe error type for use across language boundaries.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CordFfiError {
    #[error("{message}")]
    General { message: String },
}

impl From<String> for CordFfiError {
    fn from(message: String) -> Self {
        CordFfiError::General { message }
    }
}

impl From<CordError> for CordFfiError {
    fn from(err: CordError) -> Self {
        CordFfiError::General {
            message: err.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Internal Error (for Rust-only use)
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors a caller of the engine can observe.
///
/// Transport failures never show up here; the session worker logs and drops
/// them.
#[derive(Debug, thiserror::Error)]
pub enum CordError {
    #[error(
        "Passed invalid value to `editor`. Must be either one of the following: {known} or a valid client id."
    )]
    InvalidProfile { value: String, known: String },

    #[error("Failed to start presence worker: {source}")]
    WorkerSpawn {
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using CordError.
pub type Result<T> = std::result::Result<T, CordError>;

impl From<CordError> for String {
    fn from(err: CordError) -> String {
        err.to_string()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Transport Errors (worker-internal)
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("No presence socket accepted a connection ({attempted} candidates tried)")]
    NoSocket { attempted: usize },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed frame: {0}")]
    Frame(#[from] FrameError),

    #[error("Timed out waiting for the presence service")]
    Timeout,

    #[error("Connection attempt cancelled")]
    Cancelled,

    #[error("Presence service closed the connection")]
    Disconnected,

    #[error("Presence service closed the connection: {code}: {message}")]
    Closed { code: i64, message: String },

    #[error("Presence service rejected the command: {code}: {message}")]
    Rejected { code: i64, message: String },

    #[error("Presence IPC is not supported on this platform")]
    Unsupported,
}

impl TransportError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        TransportError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the socket is unusable after this error.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            TransportError::Io { .. }
                | TransportError::Frame(_)
                | TransportError::Disconnected
                | TransportError::Closed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_profile_message_names_known_profiles() {
        let err = CordError::InvalidProfile {
            value: "emacs".to_string(),
            known: "vim, neovim".to_string(),
        };
        let message = String::from(err);
        assert!(message.starts_with("Passed invalid value to `editor`"));
        assert!(message.contains("vim, neovim or a valid client id"));
    }

    #[test]
    fn rejected_command_keeps_connection() {
        let err = TransportError::Rejected {
            code: 4000,
            message: "bad activity".to_string(),
        };
        assert!(!err.is_connection_lost());
        assert!(TransportError::Disconnected.is_connection_lost());
        assert!(!TransportError::Timeout.is_connection_lost());
    }
}
