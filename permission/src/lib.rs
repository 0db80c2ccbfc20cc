//! Runtime permission vocabulary shared by the geokit crates.
//!
//! The platform owns the actual permission dialogs; this crate only models
//! what the host can ask for and what the platform reported back.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Permissions a location-aware screen can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum Permission {
    /// Precise (GPS-grade) location access.
    FineLocation,
    /// Approximate (network-grade) location access.
    CoarseLocation,
}

/// Outcome of a permission request, as reported by the platform callback.
///
/// The status is never persisted; it is re-established from the callback on
/// every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionStatus {
    /// No request has completed yet.
    #[default]
    Unknown,
    /// The user granted the permission.
    Granted,
    /// The user denied the permission, or the platform restricted it.
    Denied,
}

impl PermissionStatus {
    /// Whether the permission is currently granted.
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Errors that can occur when asking the platform about permissions.
#[derive(Debug, Clone, Error)]
pub enum PermissionError {
    /// The permission type is not supported on this platform.
    #[error("permission not supported on this platform")]
    NotSupported,
    /// An error occurred in the underlying platform implementation.
    #[error("platform error: {0}")]
    Platform(String),
}
