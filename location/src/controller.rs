//! Driver that connects the pure state machine to a platform backend and a
//! host screen.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_channel::{Receiver, Sender, unbounded};
use geokit_permission::Permission;
use log::{debug, error, warn};

use crate::LocationAware;
use crate::backend::{ClientDelegate, LocationBackend};
use crate::config::{RequestCodes, UpdateRequest};
use crate::event::ClientEvent;
use crate::machine::{Command, Input, Machine, Phase};

/// Orchestrates the location client lifecycle for one host screen.
///
/// All inputs — host lifecycle hooks, platform events, probes — are
/// serialized through a single pending queue and drained in arrival order,
/// so overlapping subscribe/unsubscribe paths cannot interleave. Backends
/// may deliver events synchronously from within a backend call; those
/// re-entrant dispatches are queued and handled by the already-running
/// drain loop.
pub struct LocationController {
    backend: Arc<dyn LocationBackend>,
    host: Arc<dyn LocationAware>,
    request: UpdateRequest,
    codes: RequestCodes,
    machine: Mutex<Machine>,
    pending: Mutex<VecDeque<Input>>,
    draining: AtomicBool,
}

impl fmt::Debug for LocationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationController")
            .field("phase", &self.phase())
            .field("request", &self.request)
            .finish()
    }
}

impl LocationController {
    /// Creates a controller and registers it as the backend's delegate.
    pub fn new(
        backend: Arc<dyn LocationBackend>,
        host: Arc<dyn LocationAware>,
        request: UpdateRequest,
        codes: RequestCodes,
    ) -> Arc<Self> {
        let controller = Arc::new(Self {
            backend,
            host,
            request,
            codes,
            machine: Mutex::new(Machine::new(codes)),
            pending: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        });

        let delegate = Arc::new(ControllerClientDelegate {
            controller: Arc::downgrade(&controller),
        });
        controller.backend.set_delegate(delegate);

        controller
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.machine.lock().expect("machine mutex poisoned").phase()
    }

    /// The screen became visible; connects or resumes updates as needed.
    pub fn on_visible(&self) {
        self.dispatch(Input::Visible);
    }

    /// The screen was backgrounded; releases the update subscription but
    /// keeps the connection alive.
    pub fn on_hidden(&self) {
        self.dispatch(Input::Hidden);
    }

    /// The screen is being destroyed; releases the client handle
    /// unconditionally.
    pub fn on_destroyed(&self) {
        self.dispatch(Input::Destroyed);
    }

    /// Re-entrant, idempotent permission probe. A no-op before the client
    /// is connected.
    pub fn check_location_permissions(&self) {
        self.dispatch(Input::ProbePermissions);
    }

    /// Re-entrant, idempotent provider probe; queries availability fresh
    /// and subscribes when everything holds. A no-op before the client is
    /// connected.
    pub fn check_location_manager(&self) {
        self.dispatch(Input::ProbeProviders);
    }

    /// Feeds one platform event into the state machine.
    pub fn handle_event(&self, event: ClientEvent) {
        self.dispatch(event.into());
    }

    fn dispatch(&self, input: Input) {
        self.pending
            .lock()
            .expect("pending queue mutex poisoned")
            .push_back(input);
        self.drain();
    }

    fn drain(&self) {
        if self.draining.swap(true, Ordering::Acquire) {
            // Another drain is running; it will pick up the queued input.
            return;
        }
        loop {
            while let Some(input) = self.pop_pending() {
                let commands = {
                    let mut machine = self.machine.lock().expect("machine mutex poisoned");
                    machine.apply(input)
                };
                for command in commands {
                    self.execute(command);
                }
            }
            self.draining.store(false, Ordering::Release);
            let queue_empty = self
                .pending
                .lock()
                .expect("pending queue mutex poisoned")
                .is_empty();
            if queue_empty || self.draining.swap(true, Ordering::Acquire) {
                break;
            }
        }
    }

    fn pop_pending(&self) -> Option<Input> {
        self.pending
            .lock()
            .expect("pending queue mutex poisoned")
            .pop_front()
    }

    fn execute(&self, command: Command) {
        match command {
            Command::Connect => {
                if let Err(err) = self.backend.connect() {
                    error!("location client connect failed: {err}");
                }
            }
            Command::Disconnect => self.backend.disconnect(),
            Command::CheckPermissions => {
                if let Err(err) = self
                    .backend
                    .request_permission(Permission::FineLocation, self.codes.permission)
                {
                    error!("location permission request failed: {err}");
                }
            }
            Command::QueryProviders => {
                let providers = self.backend.provider_availability();
                self.pending
                    .lock()
                    .expect("pending queue mutex poisoned")
                    .push_back(Input::ProvidersChecked { providers });
            }
            Command::RequestUpdates => {
                if let Err(err) = self.backend.request_updates(&self.request) {
                    error!("location update subscription failed: {err}");
                }
            }
            Command::RemoveUpdates => self.backend.remove_updates(),
            Command::BeginResolution { request_code } => {
                if let Err(err) = self.backend.begin_resolution(request_code) {
                    error!("unable to launch connection resolution: {err}");
                    self.backend.notify_failure(&err);
                }
            }
            Command::PresentRecovery { choice } => {
                self.backend.present_recovery(choice, self.codes.settings);
            }
            Command::NotifyFailure { error } => {
                warn!("location client failure: {error}");
                self.backend.notify_failure(&error);
            }
            Command::DeliverFix { fix } => {
                debug!(
                    "fix >>> latitude: {} longitude: {}",
                    fix.latitude, fix.longitude
                );
                self.host.on_location_retrieved(fix);
            }
        }
    }
}

/// Backend delegate holding a weak controller reference, so the backend does
/// not keep the controller alive past the host screen.
struct ControllerClientDelegate {
    controller: Weak<LocationController>,
}

impl ClientDelegate for ControllerClientDelegate {
    fn on_event(&self, event: ClientEvent) {
        if let Some(controller) = self.controller.upgrade() {
            controller.handle_event(event);
        }
    }
}

/// Delegate that forwards client events into an unbounded channel.
///
/// Useful when the platform delivers events on threads the host does not
/// control: pair it with [`pump_events`] on the host executor to funnel
/// everything through one consumer, preserving delivery order.
#[derive(Debug, Clone)]
pub struct ChannelClientDelegate {
    sender: Sender<ClientEvent>,
}

impl ChannelClientDelegate {
    /// Creates the delegate and the receiving end for [`pump_events`].
    #[must_use]
    pub fn new() -> (Self, Receiver<ClientEvent>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }
}

impl ClientDelegate for ChannelClientDelegate {
    fn on_event(&self, event: ClientEvent) {
        if let Err(err) = self.sender.try_send(event) {
            warn!("dropping location client event: {err}");
        }
    }
}

/// Forwards channel events into the controller until every sender is gone.
pub async fn pump_events(receiver: Receiver<ClientEvent>, controller: Arc<LocationController>) {
    while let Ok(event) = receiver.recv().await {
        controller.handle_event(event);
    }
}

#[cfg(test)]
mod tests {
    use geokit_permission::PermissionStatus;

    use super::*;
    use crate::backend::RecoveryChoice;
    use crate::error::{LocationError, LocationResult};
    use crate::event::{Fix, ProviderAvailability};

    #[derive(Debug, Clone, PartialEq)]
    enum BackendCall {
        Connect,
        Disconnect,
        RequestUpdates(UpdateRequest),
        RemoveUpdates,
        RequestPermission(Permission, i32),
        BeginResolution(i32),
        PresentRecovery(RecoveryChoice, i32),
        NotifyFailure(LocationError),
    }

    struct MockBackend {
        calls: Mutex<Vec<BackendCall>>,
        providers: Mutex<ProviderAvailability>,
        delegate: Mutex<Option<Arc<dyn ClientDelegate>>>,
        // When set, connect() reports Connected synchronously from within
        // the backend call, exercising re-entrant dispatch.
        connect_reports_connected: AtomicBool,
    }

    impl MockBackend {
        fn new(providers: ProviderAvailability) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                providers: Mutex::new(providers),
                delegate: Mutex::new(None),
                connect_reports_connected: AtomicBool::new(false),
            })
        }

        fn calls(&self) -> Vec<BackendCall> {
            self.calls.lock().expect("calls mutex poisoned").clone()
        }

        fn record(&self, call: BackendCall) {
            self.calls.lock().expect("calls mutex poisoned").push(call);
        }

        fn emit(&self, event: ClientEvent) {
            let delegate = self
                .delegate
                .lock()
                .expect("delegate mutex poisoned")
                .clone();
            delegate
                .expect("no delegate registered")
                .on_event(event);
        }

        fn set_providers(&self, providers: ProviderAvailability) {
            *self.providers.lock().expect("providers mutex poisoned") = providers;
        }
    }

    impl fmt::Debug for MockBackend {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("MockBackend").finish()
        }
    }

    impl LocationBackend for MockBackend {
        fn set_delegate(&self, delegate: Arc<dyn ClientDelegate>) {
            *self.delegate.lock().expect("delegate mutex poisoned") = Some(delegate);
        }

        fn connect(&self) -> LocationResult<()> {
            self.record(BackendCall::Connect);
            if self.connect_reports_connected.load(Ordering::Relaxed) {
                self.emit(ClientEvent::Connected);
            }
            Ok(())
        }

        fn disconnect(&self) {
            self.record(BackendCall::Disconnect);
        }

        fn request_updates(&self, request: &UpdateRequest) -> LocationResult<()> {
            self.record(BackendCall::RequestUpdates(request.clone()));
            Ok(())
        }

        fn remove_updates(&self) {
            self.record(BackendCall::RemoveUpdates);
        }

        fn provider_availability(&self) -> ProviderAvailability {
            *self.providers.lock().expect("providers mutex poisoned")
        }

        fn request_permission(
            &self,
            permission: Permission,
            request_code: i32,
        ) -> LocationResult<()> {
            self.record(BackendCall::RequestPermission(permission, request_code));
            Ok(())
        }

        fn begin_resolution(&self, request_code: i32) -> LocationResult<()> {
            self.record(BackendCall::BeginResolution(request_code));
            Ok(())
        }

        fn present_recovery(&self, choice: RecoveryChoice, request_code: i32) {
            self.record(BackendCall::PresentRecovery(choice, request_code));
        }

        fn notify_failure(&self, error: &LocationError) {
            self.record(BackendCall::NotifyFailure(error.clone()));
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        fixes: Mutex<Vec<Fix>>,
    }

    impl RecordingHost {
        fn fixes(&self) -> Vec<Fix> {
            self.fixes.lock().expect("fixes mutex poisoned").clone()
        }
    }

    impl LocationAware for RecordingHost {
        fn on_location_retrieved(&self, fix: Fix) {
            self.fixes.lock().expect("fixes mutex poisoned").push(fix);
        }
    }

    const BOTH_ON: ProviderAvailability = ProviderAvailability {
        gps_enabled: true,
        network_enabled: true,
    };

    fn fix(latitude: f64) -> Fix {
        Fix {
            latitude,
            longitude: 9.19,
            altitude: Some(120.0),
            horizontal_accuracy: Some(8.0),
            timestamp: 1_700_000_000_000,
        }
    }

    fn controller_with(
        providers: ProviderAvailability,
    ) -> (Arc<LocationController>, Arc<MockBackend>, Arc<RecordingHost>) {
        let backend = MockBackend::new(providers);
        let host = Arc::new(RecordingHost::default());
        let controller = LocationController::new(
            backend.clone(),
            host.clone(),
            UpdateRequest::default(),
            RequestCodes::default(),
        );
        (controller, backend, host)
    }

    fn bring_to_active(controller: &LocationController, backend: &MockBackend) {
        controller.on_visible();
        backend.emit(ClientEvent::Connected);
        backend.emit(ClientEvent::PermissionResult {
            request_code: 500,
            status: PermissionStatus::Granted,
        });
        assert_eq!(controller.phase(), Phase::UpdatesActive);
    }

    #[test]
    fn connect_flow_drives_backend_in_order() {
        let (controller, backend, _host) = controller_with(BOTH_ON);
        bring_to_active(&controller, &backend);

        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::Connect,
                BackendCall::RequestPermission(Permission::FineLocation, 500),
                BackendCall::RequestUpdates(UpdateRequest::default()),
            ]
        );
    }

    #[test]
    fn synchronous_backend_callbacks_do_not_deadlock() {
        let (controller, backend, _host) = controller_with(BOTH_ON);
        backend
            .connect_reports_connected
            .store(true, Ordering::Relaxed);

        controller.on_visible();

        assert_eq!(controller.phase(), Phase::Connected);
        assert!(
            backend
                .calls()
                .contains(&BackendCall::RequestPermission(Permission::FineLocation, 500))
        );
    }

    #[test]
    fn fixes_reach_the_host_once_each_in_order() {
        let (controller, backend, host) = controller_with(BOTH_ON);
        bring_to_active(&controller, &backend);

        backend.emit(ClientEvent::FixReceived { fix: fix(45.0) });
        backend.emit(ClientEvent::FixReceived { fix: fix(45.1) });
        backend.emit(ClientEvent::FixReceived { fix: fix(45.2) });

        assert_eq!(host.fixes(), vec![fix(45.0), fix(45.1), fix(45.2)]);
    }

    #[test]
    fn fixes_after_pause_are_dropped() {
        let (controller, backend, host) = controller_with(BOTH_ON);
        bring_to_active(&controller, &backend);

        controller.on_hidden();
        backend.emit(ClientEvent::FixReceived { fix: fix(45.0) });

        assert!(host.fixes().is_empty());
        assert_eq!(controller.phase(), Phase::UpdatesPaused);
    }

    #[test]
    fn pause_and_resume_resubscribe_with_fresh_provider_query() {
        let (controller, backend, _host) = controller_with(BOTH_ON);
        bring_to_active(&controller, &backend);

        controller.on_hidden();
        controller.on_visible();

        assert_eq!(controller.phase(), Phase::UpdatesActive);
        let subscribes = backend
            .calls()
            .iter()
            .filter(|call| matches!(call, BackendCall::RequestUpdates(_)))
            .count();
        assert_eq!(subscribes, 2);
    }

    #[test]
    fn destroy_removes_updates_before_disconnecting() {
        let (controller, backend, _host) = controller_with(BOTH_ON);
        bring_to_active(&controller, &backend);

        controller.on_destroyed();

        assert_eq!(controller.phase(), Phase::Disconnected);
        let calls = backend.calls();
        assert_eq!(
            &calls[calls.len() - 2..],
            &[BackendCall::RemoveUpdates, BackendCall::Disconnect]
        );
    }

    #[test]
    fn disabled_providers_present_settings_choice_instead_of_subscribing() {
        let (controller, backend, _host) = controller_with(ProviderAvailability::default());
        controller.on_visible();
        backend.emit(ClientEvent::Connected);
        backend.emit(ClientEvent::PermissionResult {
            request_code: 500,
            status: PermissionStatus::Granted,
        });

        let calls = backend.calls();
        assert!(calls.contains(&BackendCall::PresentRecovery(
            RecoveryChoice::LocationSettings,
            44
        )));
        assert!(
            !calls
                .iter()
                .any(|call| matches!(call, BackendCall::RequestUpdates(_)))
        );
        assert_eq!(controller.phase(), Phase::Connected);
    }

    #[test]
    fn provider_probe_after_user_enabled_settings_subscribes() {
        let (controller, backend, _host) = controller_with(ProviderAvailability::default());
        controller.on_visible();
        backend.emit(ClientEvent::Connected);
        backend.emit(ClientEvent::PermissionResult {
            request_code: 500,
            status: PermissionStatus::Granted,
        });
        assert_eq!(controller.phase(), Phase::Connected);

        // The user enabled a provider in settings and came back.
        backend.set_providers(BOTH_ON);
        controller.check_location_manager();

        assert_eq!(controller.phase(), Phase::UpdatesActive);
    }

    #[test]
    fn provider_probe_is_idempotent() {
        let (controller, backend, _host) = controller_with(BOTH_ON);
        bring_to_active(&controller, &backend);

        controller.check_location_manager();
        controller.check_location_manager();

        // Still exactly one subscription.
        let subscribes = backend
            .calls()
            .iter()
            .filter(|call| matches!(call, BackendCall::RequestUpdates(_)))
            .count();
        assert_eq!(subscribes, 1);
        assert_eq!(controller.phase(), Phase::UpdatesActive);
    }

    #[test]
    fn resolvable_failure_retries_connect_after_resolution() {
        let (controller, backend, _host) = controller_with(BOTH_ON);
        controller.on_visible();
        backend.emit(ClientEvent::ConnectionFailed {
            code: 2,
            resolvable: true,
        });

        assert!(backend.calls().contains(&BackendCall::BeginResolution(300)));
        assert_eq!(controller.phase(), Phase::Connecting);

        backend.emit(ClientEvent::ResolutionFinished {
            request_code: 300,
            success: true,
        });

        let connects = backend
            .calls()
            .iter()
            .filter(|call| **call == BackendCall::Connect)
            .count();
        assert_eq!(connects, 2);
    }

    #[test]
    fn fatal_failure_is_surfaced_and_nothing_else_happens() {
        let (controller, backend, _host) = controller_with(BOTH_ON);
        controller.on_visible();
        backend.emit(ClientEvent::ConnectionFailed {
            code: 8,
            resolvable: false,
        });

        assert!(backend.calls().contains(&BackendCall::NotifyFailure(
            LocationError::ConnectionFailed {
                code: 8,
                resolvable: false,
            }
        )));
        assert_eq!(controller.phase(), Phase::Connecting);
    }

    #[test]
    fn denied_permission_presents_app_settings() {
        let (controller, backend, _host) = controller_with(BOTH_ON);
        controller.on_visible();
        backend.emit(ClientEvent::Connected);
        backend.emit(ClientEvent::PermissionResult {
            request_code: 500,
            status: PermissionStatus::Denied,
        });

        assert!(backend.calls().contains(&BackendCall::PresentRecovery(
            RecoveryChoice::AppSettings,
            44
        )));
        assert_eq!(controller.phase(), Phase::Connected);
    }

    #[test]
    fn channel_delegate_preserves_delivery_order() {
        let backend = MockBackend::new(BOTH_ON);
        let host = Arc::new(RecordingHost::default());
        let controller = LocationController::new(
            backend.clone(),
            host.clone(),
            UpdateRequest::default(),
            RequestCodes::default(),
        );

        let (delegate, receiver) = ChannelClientDelegate::new();
        controller.on_visible();
        delegate.on_event(ClientEvent::Connected);
        delegate.on_event(ClientEvent::PermissionResult {
            request_code: 500,
            status: PermissionStatus::Granted,
        });
        delegate.on_event(ClientEvent::FixReceived { fix: fix(45.0) });
        delegate.on_event(ClientEvent::FixReceived { fix: fix(45.1) });
        drop(delegate);

        futures::executor::block_on(pump_events(receiver, controller.clone()));

        assert_eq!(controller.phase(), Phase::UpdatesActive);
        assert_eq!(host.fixes(), vec![fix(45.0), fix(45.1)]);
    }
}
