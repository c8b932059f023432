//! Dispatch error types

use thiserror::Error;

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Errors surfaced by the routing/dispatch core.
///
/// The dispatch and send paths themselves never propagate these to their
/// callers; they log and degrade. The type exists for the collaborator seams:
/// service handlers report processing failures through it, and the discovery
/// payload codec uses it for malformed handshakes.
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    /// A local service handler failed while processing a request
    #[error("handler error: {message}")]
    Handler { message: String },

    /// Malformed protocol payload (discovery handshake)
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl DispatchError {
    /// Create a handler error
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}
