//! Camera and microphone for the broadcaster.
//!
//! Acquisition initializes the device layer, requests a media stream controller, and wraps it
//! in encoder UI state. Teardown closes the controller before disposing the state that owns it.
//!
//! If the devices cannot be acquired (most commonly because the user denied access) the slot
//! simply stays empty, and whatever depends on it does not render.

use crate::Error;
use crate::lifecycle::{Lifecycle, Phase};
use std::sync::Arc;
use tracing::instrument;
use video_client_sdk::{EncoderUiState, MediaStreamController, Sdk, SdkError};

/// Reason given to the media stream controller when it is closed.
pub const CONTROLLER_CLOSE_REASON: &str = "Closed by unmounting/re-render";

/// Reason given to the encoder UI state when it is disposed.
pub const ENCODER_UI_DISPOSE_REASON: &str = "Component unmounting/re-render";

fn teardown<U: EncoderUiState>(mut ui: U) {
    if let Some(controller) = ui.media_stream_controller() {
        controller.close(CONTROLLER_CLOSE_REASON);
    }
    ui.dispose(ENCODER_UI_DISPOSE_REASON);
}

pub struct EncoderUiBinding<S: Sdk> {
    sdk: Arc<S>,
    slot: Lifecycle<S::EncoderUi>,
}

impl<S: Sdk> EncoderUiBinding<S> {
    pub fn new(sdk: Arc<S>) -> Self {
        Self {
            sdk,
            slot: Lifecycle::new("encoder ui"),
        }
    }

    /// Acquire the local devices and wrap them in encoder UI state.
    ///
    /// Returns `Ok(true)` if new state was installed, and `Ok(false)` if there already was
    /// state or the binding was released while the devices were being acquired (in which case
    /// the freshly acquired controller is closed right away).
    #[instrument(skip_all, err)]
    pub async fn acquire(&self) -> Result<bool, Error> {
        let Some(ticket) = self.slot.begin().await else {
            return Ok(false);
        };

        let controller = match self.request_controller().await {
            Ok(controller) => controller,
            Err(e) => {
                self.slot.abort(ticket).await;
                return Err(Error::DeviceAcquisition(e));
            }
        };

        let ui = self.sdk.encoder_ui(controller);
        Ok(self.slot.commit(ticket, ui, teardown).await)
    }

    async fn request_controller(&self) -> Result<S::Controller, SdkError> {
        self.sdk.init_media().await?;
        self.sdk.request_controller().await
    }

    /// Close the media stream controller and dispose the encoder UI state.
    #[instrument(skip_all)]
    pub async fn release(&self) -> bool {
        self.slot.release(teardown).await
    }

    /// Run `f` against the live encoder UI state.
    pub async fn with<R>(&self, f: impl FnOnce(&mut S::EncoderUi) -> R) -> Option<R> {
        self.slot.with(f).await
    }

    pub async fn phase(&self) -> Phase {
        self.slot.phase().await
    }

    pub async fn is_ready(&self) -> bool {
        self.slot.is_ready().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use video_client_sdk::mock::{MockSdk, SdkCall};

    #[tokio::test]
    async fn acquire_initializes_first() {
        let sdk = Arc::new(MockSdk::new());
        let binding = EncoderUiBinding::new(Arc::clone(&sdk));
        assert!(binding.acquire().await.unwrap());
        assert!(binding.is_ready().await);
        assert!(!binding.acquire().await.unwrap());

        assert_eq!(
            sdk.journal().calls(),
            vec![
                SdkCall::MediaInitialized,
                SdkCall::ControllerRequested,
                SdkCall::ControllerAcquired { controller: 1 },
                SdkCall::EncoderUiCreated { controller: 1 },
            ]
        );
        assert_eq!(sdk.open_controllers(), 1);
    }

    #[tokio::test]
    async fn release_closes_then_disposes() {
        let sdk = Arc::new(MockSdk::new());
        let binding = EncoderUiBinding::new(Arc::clone(&sdk));
        binding.acquire().await.unwrap();
        sdk.journal().clear();

        assert!(binding.release().await);
        assert!(!binding.release().await);
        assert_eq!(
            sdk.journal().calls(),
            vec![
                SdkCall::ControllerClosed {
                    controller: 1,
                    reason: CONTROLLER_CLOSE_REASON.to_string(),
                },
                SdkCall::EncoderUiDisposed {
                    controller: 1,
                    reason: ENCODER_UI_DISPOSE_REASON.to_string(),
                },
            ]
        );
        assert_eq!(sdk.open_controllers(), 0);
        assert_eq!(binding.phase().await, Phase::Disposed);
    }

    #[tokio::test]
    async fn denied_devices_leave_no_state() {
        let sdk = Arc::new(MockSdk::new());
        sdk.deny_devices();
        let binding = EncoderUiBinding::new(Arc::clone(&sdk));

        let err = binding.acquire().await.unwrap_err();
        assert!(
            matches!(err, Error::DeviceAcquisition(SdkError::PermissionDenied)),
            "{err:?}"
        );
        assert_eq!(binding.phase().await, Phase::Absent);
        assert!(!binding.release().await);
        assert_eq!(
            sdk.journal()
                .count(|c| matches!(c, SdkCall::EncoderUiCreated { .. })),
            0
        );
    }

    #[tokio::test]
    async fn release_during_acquisition_closes_late_controller() {
        let sdk = Arc::new(MockSdk::new());
        let gate = sdk.hold_controller_requests();
        let binding = EncoderUiBinding::new(Arc::clone(&sdk));

        let (installed, ()) = tokio::join!(binding.acquire(), async {
            gate.requested().await;
            assert!(!binding.release().await);
            assert_eq!(binding.phase().await, Phase::Disposing);
            gate.release();
        });

        assert!(!installed.unwrap());
        assert_eq!(binding.phase().await, Phase::Disposed);
        assert_eq!(sdk.open_controllers(), 0);
        assert_eq!(
            sdk.journal()
                .count(|c| matches!(c, SdkCall::ControllerClosed { controller: 1, .. })),
            1
        );
    }
}
