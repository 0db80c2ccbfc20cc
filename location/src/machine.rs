//! Pure lifecycle state machine for the location client.
//!
//! The machine never performs I/O: it consumes typed [`Input`]s and returns
//! the [`Command`]s the driver must execute against the backend. This keeps
//! every transition testable without platform plumbing.

use geokit_permission::PermissionStatus;

use crate::backend::RecoveryChoice;
use crate::config::RequestCodes;
use crate::error::LocationError;
use crate::event::{ClientEvent, Fix, ProviderAvailability};

/// Lifecycle phase of the client handle and its update subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No connection has been requested yet.
    #[default]
    Idle,
    /// A connect request is in flight (or failed and awaits resolution).
    Connecting,
    /// The client handle is connected; no subscription yet.
    Connected,
    /// Connected with an active update subscription.
    UpdatesActive,
    /// Connected, subscription released while the screen is hidden.
    UpdatesPaused,
    /// The client handle has been released.
    Disconnected,
}

/// Inputs to the transition function.
///
/// Lifecycle inputs come from the host screen, client inputs from the
/// platform via [`ClientEvent`], and probe inputs from the re-entrant
/// permission/provider checks.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// The screen became visible.
    Visible,
    /// The screen was backgrounded.
    Hidden,
    /// The screen is being destroyed.
    Destroyed,
    /// The platform reported the client connected.
    Connected,
    /// The platform reported a connection failure.
    ConnectionFailed {
        /// Platform-defined failure code.
        code: i32,
        /// Whether a resolution flow exists for this failure.
        resolvable: bool,
    },
    /// A resolution flow returned to the foreground.
    ResolutionFinished {
        /// Request code the flow was started with.
        request_code: i32,
        /// Whether the user completed the resolution.
        success: bool,
    },
    /// A runtime permission request completed.
    PermissionResult {
        /// Request code the prompt was started with.
        request_code: i32,
        /// Reported status.
        status: PermissionStatus,
    },
    /// A fresh provider availability query finished.
    ProvidersChecked {
        /// Current provider availability.
        providers: ProviderAvailability,
    },
    /// The platform delivered a location fix.
    FixReceived {
        /// The delivered fix.
        fix: Fix,
    },
    /// Re-entrant permission probe.
    ProbePermissions,
    /// Re-entrant provider probe.
    ProbeProviders,
}

impl From<ClientEvent> for Input {
    fn from(event: ClientEvent) -> Self {
        match event {
            ClientEvent::Connected => Self::Connected,
            ClientEvent::ConnectionFailed { code, resolvable } => {
                Self::ConnectionFailed { code, resolvable }
            }
            ClientEvent::ResolutionFinished {
                request_code,
                success,
            } => Self::ResolutionFinished {
                request_code,
                success,
            },
            ClientEvent::PermissionResult {
                request_code,
                status,
            } => Self::PermissionResult {
                request_code,
                status,
            },
            ClientEvent::FixReceived { fix } => Self::FixReceived { fix },
        }
    }
}

/// Side effects the driver executes after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ask the client handle to connect.
    Connect,
    /// Release the client handle.
    Disconnect,
    /// Start the runtime permission prompt.
    CheckPermissions,
    /// Query provider availability; the answer is fed back as
    /// [`Input::ProvidersChecked`].
    QueryProviders,
    /// Subscribe to periodic updates.
    RequestUpdates,
    /// Remove the update subscription.
    RemoveUpdates,
    /// Launch the resolution flow for a resolvable connection failure.
    BeginResolution {
        /// Request code to correlate the flow's result.
        request_code: i32,
    },
    /// Present the user a recoverable settings-or-cancel choice.
    PresentRecovery {
        /// Which settings surface to offer.
        choice: RecoveryChoice,
    },
    /// Surface a non-fatal failure as a transient notice.
    NotifyFailure {
        /// The failure to surface.
        error: LocationError,
    },
    /// Invoke the host extension point with a fix.
    DeliverFix {
        /// The fix to deliver.
        fix: Fix,
    },
}

/// The lifecycle state machine.
///
/// An update subscription exists only while the handle is connected, the
/// permission is granted, at least one provider is enabled and the screen
/// is visible. Provider availability is never cached here; every subscribe
/// is preceded by a fresh [`Command::QueryProviders`].
#[derive(Debug, Clone)]
pub struct Machine {
    phase: Phase,
    permission: PermissionStatus,
    visible: bool,
    codes: RequestCodes,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(RequestCodes::default())
    }
}

impl Machine {
    /// Creates a machine in [`Phase::Idle`] with the given request codes.
    #[must_use]
    pub const fn new(codes: RequestCodes) -> Self {
        Self {
            phase: Phase::Idle,
            permission: PermissionStatus::Unknown,
            visible: false,
            codes,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Last permission status reported by the platform.
    #[must_use]
    pub const fn permission(&self) -> PermissionStatus {
        self.permission
    }

    /// Whether an update subscription is currently active.
    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        matches!(self.phase, Phase::UpdatesActive)
    }

    const fn is_connected(&self) -> bool {
        matches!(
            self.phase,
            Phase::Connected | Phase::UpdatesActive | Phase::UpdatesPaused
        )
    }

    /// Applies one input and returns the commands to execute, in order.
    pub fn apply(&mut self, input: Input) -> Vec<Command> {
        match input {
            Input::Visible => self.on_visible(),
            Input::Hidden => self.on_hidden(),
            Input::Destroyed => self.on_destroyed(),
            Input::Connected => self.on_connected(),
            Input::ConnectionFailed { code, resolvable } => {
                self.on_connection_failed(code, resolvable)
            }
            Input::ResolutionFinished {
                request_code,
                success,
            } => self.on_resolution_finished(request_code, success),
            Input::PermissionResult {
                request_code,
                status,
            } => self.on_permission_result(request_code, status),
            Input::ProvidersChecked { providers } => self.on_providers_checked(providers),
            Input::FixReceived { fix } => self.on_fix(fix),
            Input::ProbePermissions => self.on_probe_permissions(),
            Input::ProbeProviders => self.on_probe_providers(),
        }
    }

    fn on_visible(&mut self) -> Vec<Command> {
        self.visible = true;
        match self.phase {
            Phase::Idle | Phase::Disconnected => {
                self.phase = Phase::Connecting;
                vec![Command::Connect]
            }
            // Resume re-probes providers fresh before resubscribing.
            Phase::UpdatesPaused => vec![Command::QueryProviders],
            Phase::Connected if self.permission.is_granted() => vec![Command::QueryProviders],
            _ => Vec::new(),
        }
    }

    fn on_hidden(&mut self) -> Vec<Command> {
        self.visible = false;
        if self.phase == Phase::UpdatesActive {
            // Release the subscription but keep the connection alive.
            self.phase = Phase::UpdatesPaused;
            vec![Command::RemoveUpdates]
        } else {
            Vec::new()
        }
    }

    fn on_destroyed(&mut self) -> Vec<Command> {
        let was_subscribed = self.is_subscribed();
        self.visible = false;
        self.phase = Phase::Disconnected;
        if was_subscribed {
            vec![Command::RemoveUpdates, Command::Disconnect]
        } else {
            vec![Command::Disconnect]
        }
    }

    fn on_connected(&mut self) -> Vec<Command> {
        if self.phase == Phase::Connecting {
            self.phase = Phase::Connected;
            vec![Command::CheckPermissions]
        } else {
            Vec::new()
        }
    }

    fn on_connection_failed(&mut self, code: i32, resolvable: bool) -> Vec<Command> {
        if self.phase != Phase::Connecting {
            return Vec::new();
        }
        // The phase stays Connecting either way: a resolvable failure waits
        // for the resolution result, a fatal one for the user.
        if resolvable {
            vec![Command::BeginResolution {
                request_code: self.codes.resolution,
            }]
        } else {
            vec![Command::NotifyFailure {
                error: LocationError::ConnectionFailed {
                    code,
                    resolvable: false,
                },
            }]
        }
    }

    fn on_resolution_finished(&mut self, request_code: i32, success: bool) -> Vec<Command> {
        if request_code == self.codes.resolution && success && self.phase == Phase::Connecting {
            vec![Command::Connect]
        } else {
            Vec::new()
        }
    }

    fn on_permission_result(
        &mut self,
        request_code: i32,
        status: PermissionStatus,
    ) -> Vec<Command> {
        if request_code != self.codes.permission {
            return Vec::new();
        }
        self.permission = status;
        if !self.is_connected() {
            return Vec::new();
        }
        match status {
            PermissionStatus::Granted => vec![Command::QueryProviders],
            PermissionStatus::Denied => vec![Command::PresentRecovery {
                choice: RecoveryChoice::AppSettings,
            }],
            PermissionStatus::Unknown => Vec::new(),
        }
    }

    fn on_providers_checked(&mut self, providers: ProviderAvailability) -> Vec<Command> {
        if !self.is_connected() {
            return Vec::new();
        }
        if !providers.any_enabled() {
            // Terminal until the user acts; no automatic retry.
            return vec![Command::PresentRecovery {
                choice: RecoveryChoice::LocationSettings,
            }];
        }
        if self.visible
            && self.permission.is_granted()
            && matches!(self.phase, Phase::Connected | Phase::UpdatesPaused)
        {
            self.phase = Phase::UpdatesActive;
            vec![Command::RequestUpdates]
        } else {
            Vec::new()
        }
    }

    fn on_fix(&self, fix: Fix) -> Vec<Command> {
        if self.phase == Phase::UpdatesActive {
            vec![Command::DeliverFix { fix }]
        } else {
            // Late fix after the subscription was released; drop it.
            Vec::new()
        }
    }

    fn on_probe_permissions(&self) -> Vec<Command> {
        if self.is_connected() {
            vec![Command::CheckPermissions]
        } else {
            Vec::new()
        }
    }

    fn on_probe_providers(&self) -> Vec<Command> {
        if self.is_connected() {
            vec![Command::QueryProviders]
        } else {
            Vec::new()
        }
    }
}
