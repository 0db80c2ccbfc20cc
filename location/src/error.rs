//! Error taxonomy for the location lifecycle.

use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type LocationResult<T> = Result<T, LocationError>;

/// Errors that can occur while driving the location client lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user denied the runtime location permission.
    #[error("location permission denied")]
    PermissionDenied,

    /// Neither the satellite nor the network provider is enabled.
    #[error("no enabled location provider")]
    ProvidersUnavailable,

    /// The platform client failed to connect.
    ///
    /// Resolvable failures can be fixed through a user-facing flow; fatal
    /// ones are surfaced as a transient notice and not retried.
    #[error("location client connection failed (code {code}, resolvable: {resolvable})")]
    ConnectionFailed {
        /// Platform-defined failure code.
        code: i32,
        /// Whether the platform offers a resolution flow for this failure.
        resolvable: bool,
    },

    /// An error occurred in the underlying platform implementation.
    #[error("platform error: {message}")]
    Platform {
        /// Platform-reported message.
        message: String,
    },

    /// An event payload could not be encoded or decoded at the bridge.
    #[error("event payload error: {message}")]
    Serialization {
        /// Codec error message.
        message: String,
    },
}
