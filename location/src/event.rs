//! Typed events delivered by the platform client.

use geokit_permission::PermissionStatus;
use serde::{Deserialize, Serialize};

/// A single reported position reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Altitude in meters above sea level, if available.
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters, if available.
    pub horizontal_accuracy: Option<f64>,
    /// Timestamp as Unix epoch milliseconds.
    pub timestamp: u64,
}

/// Whether the platform's location providers are currently enabled.
///
/// Always queried fresh before subscribing, never cached. A failed platform
/// query reports the provider as disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAvailability {
    /// The satellite-based provider is enabled.
    pub gps_enabled: bool,
    /// The network-based provider is enabled.
    pub network_enabled: bool,
}

impl ProviderAvailability {
    /// Whether at least one provider can deliver fixes.
    #[must_use]
    pub const fn any_enabled(self) -> bool {
        self.gps_enabled || self.network_enabled
    }
}

/// Events the platform client pushes into the controller.
///
/// These cross the bridge as tagged JSON; the shapes here are the wire
/// contract with the platform side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// The client handle reached the connected state.
    Connected,
    /// The client handle failed to connect.
    ConnectionFailed {
        /// Platform-defined failure code.
        code: i32,
        /// Whether a user-facing resolution flow exists for this failure.
        resolvable: bool,
    },
    /// A previously started resolution flow returned to the foreground.
    ResolutionFinished {
        /// Request code the flow was started with.
        request_code: i32,
        /// Whether the user completed the resolution successfully.
        success: bool,
    },
    /// A runtime permission request completed.
    PermissionResult {
        /// Request code the permission prompt was started with.
        request_code: i32,
        /// Status reported by the platform.
        status: PermissionStatus,
    },
    /// The client delivered a location fix.
    FixReceived {
        /// The latest fix, unwrapped from the platform result envelope.
        fix: Fix,
    },
}
