//! Call state for the broadcaster.
//!
//! Teardown stops the broadcast, then closes the call, then disposes the state. The broadcast
//! has to stop first so that in-flight broadcast data is flushed or cancelled while the
//! transport is still up.

use crate::lifecycle::{Lifecycle, Phase};
use std::sync::Arc;
use tracing::instrument;
use video_client_sdk::{Call, CallState, Sdk};

/// Reason given to the call when it is closed.
pub const CALL_CLOSE_REASON: &str = "Closed by call state on unmount/re-render";

fn teardown<C: CallState>(mut state: C) {
    state.stop_broadcast();
    if let Some(call) = state.call() {
        call.close(CALL_CLOSE_REASON);
    }
    state.dispose();
}

pub struct CallStateBinding<S: Sdk> {
    sdk: Arc<S>,
    slot: Lifecycle<S::CallUi>,
}

impl<S: Sdk> CallStateBinding<S> {
    pub fn new(sdk: Arc<S>) -> Self {
        Self {
            sdk,
            slot: Lifecycle::new("call state"),
        }
    }

    /// Construct call state unless it already exists.
    #[instrument(skip_all)]
    pub async fn acquire(&self) -> bool {
        self.slot.acquire(|| self.sdk.call_state(), teardown).await
    }

    #[instrument(skip_all)]
    pub async fn release(&self) -> bool {
        self.slot.release(teardown).await
    }

    /// Run `f` against the live call state.
    pub async fn with<R>(&self, f: impl FnOnce(&mut S::CallUi) -> R) -> Option<R> {
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
    async fn teardown_order_with_live_broadcast() {
        let sdk = Arc::new(MockSdk::new());
        let binding = CallStateBinding::new(Arc::clone(&sdk));
        assert!(binding.acquire().await);
        assert!(!binding.acquire().await);
        binding.with(|state| state.join_broadcast("demo")).await;
        sdk.journal().clear();

        assert!(binding.release().await);
        assert_eq!(
            sdk.journal().calls(),
            vec![
                SdkCall::BroadcastStopped { call_state: 1 },
                SdkCall::CallClosed {
                    call_state: 1,
                    reason: CALL_CLOSE_REASON.to_string(),
                },
                SdkCall::CallStateDisposed { call_state: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn teardown_without_call() {
        let sdk = Arc::new(MockSdk::new());
        let binding = CallStateBinding::new(Arc::clone(&sdk));
        binding.acquire().await;
        sdk.journal().clear();

        assert!(binding.release().await);
        assert!(!binding.release().await);
        assert_eq!(
            sdk.journal().calls(),
            vec![
                SdkCall::BroadcastStopped { call_state: 1 },
                SdkCall::CallStateDisposed { call_state: 1 },
            ]
        );
        assert_eq!(binding.phase().await, Phase::Disposed);
    }
}
