//! Boundary with the platform's location-services client.

use std::fmt;
use std::sync::Arc;

use geokit_permission::Permission;
use serde::{Deserialize, Serialize};

use crate::config::UpdateRequest;
use crate::error::{LocationError, LocationResult};
use crate::event::{ClientEvent, ProviderAvailability};

/// Recoverable choice presented to the user instead of a silent retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecoveryChoice {
    /// Offer to open the application settings (permission was denied).
    AppSettings,
    /// Offer to open the system location settings (no provider enabled).
    LocationSettings,
}

/// Receiver for events pushed by a [`LocationBackend`].
pub trait ClientDelegate: Send + Sync {
    /// Called with each event the platform client produces, in order.
    fn on_event(&self, event: ClientEvent);
}

/// Platform side of the location lifecycle.
///
/// Implementations own the client handle and all platform UI (permission
/// prompts, settings dialogs, transient notices). Calls arrive serialized
/// from the controller; events flow back through the registered
/// [`ClientDelegate`].
pub trait LocationBackend: Send + Sync + fmt::Debug {
    /// Registers the delegate that receives client events.
    fn set_delegate(&self, delegate: Arc<dyn ClientDelegate>);

    /// Asks the client handle to connect.
    ///
    /// # Errors
    /// Returns an error if the connect request cannot be issued. The
    /// outcome of the attempt itself arrives later as a
    /// [`ClientEvent::Connected`] or [`ClientEvent::ConnectionFailed`].
    fn connect(&self) -> LocationResult<()>;

    /// Releases the client handle. Idempotent.
    fn disconnect(&self);

    /// Subscribes to periodic location updates.
    ///
    /// # Errors
    /// Returns an error if the subscription cannot be created.
    fn request_updates(&self, request: &UpdateRequest) -> LocationResult<()>;

    /// Removes the update subscription. Idempotent.
    fn remove_updates(&self);

    /// Queries whether the location providers are currently enabled.
    ///
    /// Must report a provider as disabled when the platform query fails.
    fn provider_availability(&self) -> ProviderAvailability;

    /// Starts the runtime permission prompt for the given permission.
    ///
    /// The result arrives later as a [`ClientEvent::PermissionResult`]
    /// carrying the same request code.
    ///
    /// # Errors
    /// Returns an error if the prompt cannot be started.
    fn request_permission(&self, permission: Permission, request_code: i32) -> LocationResult<()>;

    /// Launches the platform resolution flow for a resolvable connection
    /// failure.
    ///
    /// The outcome arrives later as a [`ClientEvent::ResolutionFinished`]
    /// carrying the same request code.
    ///
    /// # Errors
    /// Returns an error if the resolution flow cannot be launched.
    fn begin_resolution(&self, request_code: i32) -> LocationResult<()>;

    /// Presents the user a recoverable choice (settings navigation or
    /// cancel). No automatic retry follows; the user acts or the branch
    /// ends here.
    fn present_recovery(&self, choice: RecoveryChoice, request_code: i32);

    /// Surfaces a non-fatal failure as a transient notice.
    fn notify_failure(&self, error: &LocationError);
}
