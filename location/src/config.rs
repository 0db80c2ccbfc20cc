//! Injected configuration for the update subscription and platform flows.

use serde::{Deserialize, Serialize};

/// Default desired interval between active location updates, in milliseconds.
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 60_000;

/// Default fastest rate at which updates are accepted, in milliseconds.
///
/// The platform may deliver faster than the desired interval when other
/// clients request location more aggressively; it never delivers faster
/// than this value.
pub const DEFAULT_FASTEST_INTERVAL_MS: u64 = DEFAULT_UPDATE_INTERVAL_MS / 2;

/// Accuracy/power trade-off requested from the platform client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    /// Most accurate fixes available, highest power use.
    #[default]
    HighAccuracy,
    /// Block-level accuracy, reduced power use.
    BalancedPower,
    /// City-level accuracy, minimal power use.
    LowPower,
    /// No active power use; piggyback on fixes requested by other clients.
    Passive,
}

/// Immutable configuration for an update subscription.
///
/// Constructed once before connecting and read-only thereafter; the
/// controller serializes it to the platform client on every subscribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// Desired interval between updates, in milliseconds. Inexact.
    pub update_interval_ms: u64,
    /// Fastest interval at which updates are accepted, in milliseconds. Exact.
    pub fastest_interval_ms: u64,
    /// Requested accuracy/power trade-off.
    pub priority: Priority,
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            fastest_interval_ms: DEFAULT_FASTEST_INTERVAL_MS,
            priority: Priority::HighAccuracy,
        }
    }
}

/// Request codes correlating platform result callbacks with the flow that
/// started them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCodes {
    /// Code for the runtime location permission request.
    pub permission: i32,
    /// Code for the open-location-settings flow.
    pub settings: i32,
    /// Code for the connection failure resolution flow.
    pub resolution: i32,
}

impl Default for RequestCodes {
    fn default() -> Self {
        Self {
            permission: 500,
            settings: 44,
            resolution: 300,
        }
    }
}
