//! In-memory SDK binding for testing front-ends.
//!
//! [`MockSdk`] implements [`Sdk`] without touching any device or network. Every call a
//! front-end makes into it is appended to a shared [`Journal`], so tests can assert on
//! ordering ("the call was closed before the call state was disposed"), and live resources
//! are tracked with high-water marks, so tests can assert that a front-end never held two of
//! something at once.
//!
//! Two knobs let tests steer device acquisition:
//! - [`MockSdk::deny_devices`] makes every later controller request fail with
//!   [`SdkError::PermissionDenied`], as a browser does when the user blocks the camera.
//! - [`MockSdk::hold_controller_requests`] parks controller requests until the returned
//!   [`ControllerGate`] lets them through, so a test can tear a screen down while an
//!   acquisition is still in flight.

use crate::{
    Call, CallState, EncoderUiState, MediaStreamController, PlayerOptions, PlayerUiState, Sdk,
    SdkError, VideoClient, VideoClientOptions,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, Semaphore};

/// A single call made into the mock SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkCall {
    ClientCreated {
        client: u64,
        user_id: String,
        with_token: bool,
    },
    ClientDisposed {
        client: u64,
    },
    MediaInitialized,
    ControllerRequested,
    ControllerAcquired {
        controller: u64,
    },
    ControllerClosed {
        controller: u64,
        reason: String,
    },
    EncoderUiCreated {
        controller: u64,
    },
    EncoderUiDisposed {
        controller: u64,
        reason: String,
    },
    CallStateCreated {
        call_state: u64,
    },
    BroadcastJoined {
        call_state: u64,
        stream_name: String,
    },
    BroadcastStopped {
        call_state: u64,
    },
    CallClosed {
        call_state: u64,
        reason: String,
    },
    CallStateDisposed {
        call_state: u64,
    },
    PlayerRequested {
        client: u64,
        player: u64,
        manifest_url: String,
    },
    PlayerUiCreated {
        player: u64,
    },
    PlayerUiDisposed {
        player: u64,
    },
}

/// Ordered record of every [`SdkCall`] made against one [`MockSdk`].
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<SdkCall>>>,
}

impl Journal {
    fn lock(&self) -> MutexGuard<'_, Vec<SdkCall>> {
        // a panicking test thread must not hide the journal from the others
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: SdkCall) {
        tracing::trace!(?call, "mock sdk call");
        self.lock().push(call);
    }

    /// All calls recorded so far, oldest first.
    pub fn calls(&self) -> Vec<SdkCall> {
        self.lock().clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&SdkCall) -> bool) -> usize {
        self.lock().iter().filter(|call| predicate(call)).count()
    }

    /// Index of the first recorded call matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&SdkCall) -> bool) -> Option<usize> {
        self.lock().iter().position(predicate)
    }

    /// Index of the last recorded call matching `predicate`.
    pub fn rposition(&self, predicate: impl Fn(&SdkCall) -> bool) -> Option<usize> {
        self.lock().iter().rposition(predicate)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Number of live instances of one kind of resource, plus the most that were ever live at
/// the same time.
#[derive(Debug, Default)]
struct Gauge {
    live: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn inc(&self) {
        let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn dec(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Shared {
    journal: Journal,
    next_id: AtomicU64,
    clients: Gauge,
    controllers: Gauge,
    player_uis: Gauge,
    media_initialized: AtomicBool,
    deny_devices: AtomicBool,
    gate: Mutex<Option<ControllerGate>>,
}

impl Shared {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn gate(&self) -> Option<ControllerGate> {
        self.gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Holds controller requests until released.
///
/// Obtained from [`MockSdk::hold_controller_requests`].
#[derive(Debug, Clone)]
pub struct ControllerGate {
    requested: Arc<Notify>,
    permits: Arc<Semaphore>,
}

impl ControllerGate {
    fn new() -> Self {
        Self {
            requested: Arc::new(Notify::new()),
            permits: Arc::new(Semaphore::new(0)),
        }
    }

    /// Resolves once a controller request has reached the gate.
    pub async fn requested(&self) {
        self.requested.notified().await;
    }

    /// Let exactly one held controller request through.
    pub fn release(&self) {
        self.permits.add_permits(1);
    }
}

/// Instrumented in-memory [`Sdk`].
///
/// Cloning a `MockSdk` yields another handle onto the same journal and counters.
#[derive(Debug, Clone, Default)]
pub struct MockSdk {
    shared: Arc<Shared>,
}

impl MockSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self) -> &Journal {
        &self.shared.journal
    }

    /// Video clients constructed and not yet disposed.
    pub fn live_clients(&self) -> usize {
        self.shared.clients.live()
    }

    /// The most video clients that were ever live at once.
    pub fn peak_clients(&self) -> usize {
        self.shared.clients.peak()
    }

    /// Media stream controllers acquired and not yet closed.
    pub fn open_controllers(&self) -> usize {
        self.shared.controllers.live()
    }

    /// The most media stream controllers that were ever open at once.
    pub fn peak_controllers(&self) -> usize {
        self.shared.controllers.peak()
    }

    /// Player UI states constructed and not yet disposed.
    pub fn live_player_uis(&self) -> usize {
        self.shared.player_uis.live()
    }

    /// The most player UI states that were ever live at once.
    pub fn peak_player_uis(&self) -> usize {
        self.shared.player_uis.peak()
    }

    /// Fail every subsequent controller request as if the user refused device access.
    pub fn deny_devices(&self) {
        self.shared.deny_devices.store(true, Ordering::SeqCst);
    }

    /// Park every subsequent controller request until the returned gate releases it.
    pub fn hold_controller_requests(&self) -> ControllerGate {
        let gate = ControllerGate::new();
        *self
            .shared
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(gate.clone());
        gate
    }
}

impl Sdk for MockSdk {
    type Client = MockVideoClient;
    type Controller = MockMediaStreamController;
    type EncoderUi = MockEncoderUi;
    type CallUi = MockCallState;
    type PlayerUi = MockPlayerUi;

    fn create_client(&self, options: VideoClientOptions) -> Self::Client {
        let id = self.shared.next_id();
        self.shared.clients.inc();
        self.shared.journal.record(SdkCall::ClientCreated {
            client: id,
            user_id: options.user_id.clone(),
            with_token: options.token.is_some(),
        });
        if let Some(span) = &options.logger {
            span.in_scope(|| {
                tracing::debug!(client = id, endpoints = ?options.backend_endpoints, "video client created");
            });
        }
        MockVideoClient {
            id,
            options,
            shared: Arc::clone(&self.shared),
            disposed: false,
        }
    }

    fn init_media(&self) -> impl Future<Output = Result<(), SdkError>> + Send {
        let shared = Arc::clone(&self.shared);
        async move {
            shared.media_initialized.store(true, Ordering::SeqCst);
            shared.journal.record(SdkCall::MediaInitialized);
            Ok(())
        }
    }

    fn request_controller(
        &self,
    ) -> impl Future<Output = Result<Self::Controller, SdkError>> + Send {
        let shared = Arc::clone(&self.shared);
        async move {
            if !shared.media_initialized.load(Ordering::SeqCst) {
                return Err(SdkError::Other(
                    "media controller requested before init".to_string(),
                ));
            }
            shared.journal.record(SdkCall::ControllerRequested);

            if let Some(gate) = shared.gate() {
                gate.requested.notify_one();
                let permit = gate
                    .permits
                    .acquire()
                    .await
                    .map_err(|_| SdkError::Other("controller gate closed".to_string()))?;
                permit.forget();
            }

            if shared.deny_devices.load(Ordering::SeqCst) {
                return Err(SdkError::PermissionDenied);
            }

            let id = shared.next_id();
            shared.controllers.inc();
            shared
                .journal
                .record(SdkCall::ControllerAcquired { controller: id });
            Ok(MockMediaStreamController {
                id,
                shared,
                closed: false,
            })
        }
    }

    fn encoder_ui(&self, controller: Self::Controller) -> Self::EncoderUi {
        self.shared.journal.record(SdkCall::EncoderUiCreated {
            controller: controller.id,
        });
        MockEncoderUi {
            controller_id: controller.id,
            controller: Some(controller),
            shared: Arc::clone(&self.shared),
            disposed: false,
        }
    }

    fn call_state(&self) -> Self::CallUi {
        let id = self.shared.next_id();
        self.shared
            .journal
            .record(SdkCall::CallStateCreated { call_state: id });
        MockCallState {
            id,
            call: None,
            broadcasting: false,
            shared: Arc::clone(&self.shared),
            disposed: false,
        }
    }

    fn player_ui(&self, player: MockPlayer) -> Self::PlayerUi {
        self.shared.player_uis.inc();
        self.shared
            .journal
            .record(SdkCall::PlayerUiCreated { player: player.id });
        MockPlayerUi {
            player,
            shared: Arc::clone(&self.shared),
            disposed: false,
        }
    }
}

#[derive(Debug)]
pub struct MockVideoClient {
    id: u64,
    options: VideoClientOptions,
    shared: Arc<Shared>,
    disposed: bool,
}

impl MockVideoClient {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn options(&self) -> &VideoClientOptions {
        &self.options
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl VideoClient for MockVideoClient {
    type Player = MockPlayer;

    fn request_player(
        &self,
        manifest_url: &str,
        _options: &PlayerOptions,
    ) -> Result<Self::Player, SdkError> {
        if self.disposed {
            return Err(SdkError::Disposed);
        }
        let id = self.shared.next_id();
        self.shared.journal.record(SdkCall::PlayerRequested {
            client: self.id,
            player: id,
            manifest_url: manifest_url.to_string(),
        });
        Ok(MockPlayer {
            id,
            manifest_url: manifest_url.to_string(),
        })
    }

    fn dispose(&mut self) {
        if std::mem::replace(&mut self.disposed, true) {
            return;
        }
        self.shared.clients.dec();
        self.shared
            .journal
            .record(SdkCall::ClientDisposed { client: self.id });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPlayer {
    id: u64,
    manifest_url: String,
}

impl MockPlayer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }
}

#[derive(Debug)]
pub struct MockMediaStreamController {
    id: u64,
    shared: Arc<Shared>,
    closed: bool,
}

impl MockMediaStreamController {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl MediaStreamController for MockMediaStreamController {
    fn close(&mut self, reason: &str) {
        if std::mem::replace(&mut self.closed, true) {
            return;
        }
        self.shared.controllers.dec();
        self.shared.journal.record(SdkCall::ControllerClosed {
            controller: self.id,
            reason: reason.to_string(),
        });
    }
}

#[derive(Debug)]
pub struct MockEncoderUi {
    controller_id: u64,
    controller: Option<MockMediaStreamController>,
    shared: Arc<Shared>,
    disposed: bool,
}

impl MockEncoderUi {
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl EncoderUiState for MockEncoderUi {
    type Controller = MockMediaStreamController;

    fn media_stream_controller(&mut self) -> Option<&mut Self::Controller> {
        self.controller.as_mut()
    }

    fn dispose(&mut self, reason: &str) {
        if std::mem::replace(&mut self.disposed, true) {
            return;
        }
        self.shared.journal.record(SdkCall::EncoderUiDisposed {
            controller: self.controller_id,
            reason: reason.to_string(),
        });
    }
}

#[derive(Debug)]
pub struct MockCallState {
    id: u64,
    call: Option<MockCall>,
    broadcasting: bool,
    shared: Arc<Shared>,
    disposed: bool,
}

impl MockCallState {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_broadcasting(&self) -> bool {
        self.broadcasting
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Join a broadcast, establishing the underlying call if needed.
    ///
    /// This is what pressing the join-broadcast control does.
    pub fn join_broadcast(&mut self, stream_name: &str) {
        self.shared.journal.record(SdkCall::BroadcastJoined {
            call_state: self.id,
            stream_name: stream_name.to_string(),
        });
        self.broadcasting = true;
        if self.call.is_none() {
            self.call = Some(MockCall {
                call_state: self.id,
                shared: Arc::clone(&self.shared),
                closed: false,
            });
        }
    }
}

impl CallState for MockCallState {
    type Call = MockCall;

    fn stop_broadcast(&mut self) {
        self.broadcasting = false;
        self.shared
            .journal
            .record(SdkCall::BroadcastStopped { call_state: self.id });
    }

    fn call(&mut self) -> Option<&mut Self::Call> {
        self.call.as_mut()
    }

    fn dispose(&mut self) {
        if std::mem::replace(&mut self.disposed, true) {
            return;
        }
        self.shared
            .journal
            .record(SdkCall::CallStateDisposed { call_state: self.id });
    }
}

#[derive(Debug)]
pub struct MockCall {
    call_state: u64,
    shared: Arc<Shared>,
    closed: bool,
}

impl MockCall {
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Call for MockCall {
    fn close(&mut self, reason: &str) {
        if std::mem::replace(&mut self.closed, true) {
            return;
        }
        self.shared.journal.record(SdkCall::CallClosed {
            call_state: self.call_state,
            reason: reason.to_string(),
        });
    }
}

#[derive(Debug)]
pub struct MockPlayerUi {
    player: MockPlayer,
    shared: Arc<Shared>,
    disposed: bool,
}

impl MockPlayerUi {
    pub fn player(&self) -> &MockPlayer {
        &self.player
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl PlayerUiState for MockPlayerUi {
    type Player = MockPlayer;

    fn dispose(&mut self) {
        if std::mem::replace(&mut self.disposed, true) {
            return;
        }
        self.shared.player_uis.dec();
        self.shared
            .journal
            .record(SdkCall::PlayerUiDisposed {
                player: self.player.id,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn controller_requires_init() {
        let sdk = MockSdk::new();
        let err = sdk.request_controller().await.unwrap_err();
        assert!(matches!(err, SdkError::Other(_)), "{err:?}");

        sdk.init_media().await.unwrap();
        let mut controller = sdk.request_controller().await.unwrap();
        assert_eq!(sdk.open_controllers(), 1);
        controller.close("done");
        controller.close("twice");
        assert_eq!(sdk.open_controllers(), 0);
        assert_eq!(
            sdk.journal()
                .count(|c| matches!(c, SdkCall::ControllerClosed { .. })),
            1
        );
    }

    #[tokio::test]
    async fn denied_devices() {
        let sdk = MockSdk::new();
        sdk.deny_devices();
        sdk.init_media().await.unwrap();
        let err = sdk.request_controller().await.unwrap_err();
        assert!(matches!(err, SdkError::PermissionDenied), "{err:?}");
        assert_eq!(sdk.open_controllers(), 0);
    }

    #[tokio::test]
    async fn gate_holds_requests() {
        let sdk = MockSdk::new();
        let gate = sdk.hold_controller_requests();
        sdk.init_media().await.unwrap();

        let (controller, ()) = tokio::join!(sdk.request_controller(), async {
            gate.requested().await;
            assert_eq!(sdk.open_controllers(), 0);
            gate.release();
        });
        assert!(controller.is_ok());
        assert_eq!(sdk.open_controllers(), 1);
    }

    #[test]
    fn client_gauges_track_peak() {
        let sdk = MockSdk::new();
        let mut a = sdk.create_client(VideoClientOptions::new(vec![], "demo"));
        let mut b = sdk.create_client(VideoClientOptions::new(vec![], "demo"));
        assert_eq!(sdk.live_clients(), 2);
        a.dispose();
        b.dispose();
        a.dispose();
        assert_eq!(sdk.live_clients(), 0);
        assert_eq!(sdk.peak_clients(), 2);

        let err = a
            .request_player("https://example.com/a.m3u8", &PlayerOptions::default())
            .unwrap_err();
        assert!(matches!(err, SdkError::Disposed), "{err:?}");
    }

    #[test]
    fn call_state_records_teardown() {
        let sdk = MockSdk::new();
        let mut state = sdk.call_state();
        assert!(state.call().is_none());
        state.join_broadcast("demo");
        assert!(state.is_broadcasting());
        state.stop_broadcast();
        state.call().unwrap().close("bye");
        state.dispose();

        let id = state.id();
        assert_eq!(
            sdk.journal().calls(),
            vec![
                SdkCall::CallStateCreated { call_state: id },
                SdkCall::BroadcastJoined {
                    call_state: id,
                    stream_name: "demo".to_string()
                },
                SdkCall::BroadcastStopped { call_state: id },
                SdkCall::CallClosed {
                    call_state: id,
                    reason: "bye".to_string()
                },
                SdkCall::CallStateDisposed { call_state: id },
            ]
        );
    }
}
