//! Location client lifecycle management for host UI screens.
//!
//! This crate wraps a platform's location-services client (connection
//! lifecycle, runtime permission prompts, GPS/network provider checks and
//! periodic location callbacks) behind a small state machine. A host screen
//! implements [`LocationAware`], forwards its visibility lifecycle to a
//! [`LocationController`], and receives every delivered fix through one
//! extension point. The actual location fix algorithm, permission dialogs
//! and settings UI stay on the platform side, behind [`LocationBackend`].

#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod machine;
pub mod sys;

pub use backend::{ClientDelegate, LocationBackend, RecoveryChoice};
pub use config::{Priority, RequestCodes, UpdateRequest};
pub use controller::{ChannelClientDelegate, LocationController, pump_events};
pub use error::{LocationError, LocationResult};
pub use event::{ClientEvent, Fix, ProviderAvailability};
pub use geokit_permission::{Permission, PermissionError, PermissionStatus};
pub use machine::Phase;

/// Capability implemented by host screens that consume location fixes.
///
/// This replaces base-class inheritance: a screen implements the capability
/// and hands itself to a [`LocationController`]. The single extension point
/// is invoked once per delivered fix, in delivery order, on the thread that
/// dispatched the platform event.
pub trait LocationAware: Send + Sync {
    /// Called with each location fix delivered while updates are active.
    fn on_location_retrieved(&self, fix: Fix);
}
