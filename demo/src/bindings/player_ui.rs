//! Player UI state for manifest playback.

use crate::Error;
use crate::bindings::VideoClientBinding;
use crate::lifecycle::{Lifecycle, Phase};
use std::sync::Arc;
use tracing::instrument;
use video_client_sdk::{PlayerOptions, PlayerUiState, Sdk};

fn teardown<P: PlayerUiState>(mut ui: P) {
    ui.dispose();
}

pub struct PlayerUiBinding<S: Sdk> {
    sdk: Arc<S>,
    slot: Lifecycle<S::PlayerUi>,
}

impl<S: Sdk> PlayerUiBinding<S> {
    pub fn new(sdk: Arc<S>) -> Self {
        Self {
            sdk,
            slot: Lifecycle::new("player ui"),
        }
    }

    /// Request a player for `manifest_url` from `client` and wrap it in player UI state.
    ///
    /// Nothing happens unless the URL is non-empty, the client is live, and there is no player
    /// UI state yet. The URL is otherwise passed to the SDK as-is. Returns whether new state was
    /// installed.
    #[instrument(skip(self, client), err)]
    pub async fn acquire(
        &self,
        client: &VideoClientBinding<S>,
        manifest_url: &str,
    ) -> Result<bool, Error> {
        if manifest_url.is_empty() {
            return Ok(false);
        }
        let Some(ticket) = self.slot.begin().await else {
            return Ok(false);
        };

        match client
            .request_player(manifest_url, &PlayerOptions::default())
            .await
        {
            None => {
                tracing::debug!("no live video client; not requesting a player");
                self.slot.abort(ticket).await;
                Ok(false)
            }
            Some(Err(e)) => {
                self.slot.abort(ticket).await;
                Err(Error::Player(e))
            }
            Some(Ok(player)) => {
                let ui = self.sdk.player_ui(player);
                Ok(self.slot.commit(ticket, ui, teardown).await)
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn release(&self) -> bool {
        self.slot.release(teardown).await
    }

    /// Run `f` against the live player UI state.
    pub async fn with<R>(&self, f: impl FnOnce(&mut S::PlayerUi) -> R) -> Option<R> {
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
    use crate::bindings::video_client::player_options;
    use crate::config::DemoConfig;
    use pretty_assertions::assert_eq;
    use video_client_sdk::SdkError;
    use video_client_sdk::mock::{MockSdk, SdkCall};

    const MANIFEST: &str = "https://example.com/manifest.m3u8";

    async fn live_client(sdk: &Arc<MockSdk>) -> VideoClientBinding<MockSdk> {
        let client = VideoClientBinding::new(Arc::clone(sdk));
        client
            .acquire(|| player_options(&DemoConfig::default()))
            .await;
        client
    }

    #[tokio::test]
    async fn gated_on_manifest_url() {
        let sdk = Arc::new(MockSdk::new());
        let client = live_client(&sdk).await;
        let binding = PlayerUiBinding::new(Arc::clone(&sdk));

        assert!(!binding.acquire(&client, "").await.unwrap());
        assert_eq!(binding.phase().await, Phase::Absent);

        assert!(binding.acquire(&client, MANIFEST).await.unwrap());
        assert!(!binding.acquire(&client, MANIFEST).await.unwrap());
        assert_eq!(
            binding
                .with(|ui| ui.player().manifest_url().to_string())
                .await
                .as_deref(),
            Some(MANIFEST)
        );
        assert_eq!(
            sdk.journal()
                .count(|c| matches!(c, SdkCall::PlayerRequested { .. })),
            1
        );
    }

    #[tokio::test]
    async fn gated_on_client() {
        let sdk = Arc::new(MockSdk::new());
        let client = VideoClientBinding::new(Arc::clone(&sdk));
        let binding = PlayerUiBinding::new(Arc::clone(&sdk));

        assert!(!binding.acquire(&client, MANIFEST).await.unwrap());
        assert_eq!(binding.phase().await, Phase::Absent);
    }

    #[tokio::test]
    async fn malformed_urls_are_forwarded() {
        let sdk = Arc::new(MockSdk::new());
        let client = live_client(&sdk).await;
        let binding = PlayerUiBinding::new(Arc::clone(&sdk));

        assert!(binding.acquire(&client, "not a url").await.unwrap());
    }

    #[tokio::test]
    async fn disposed_client_fails_request() {
        let sdk = Arc::new(MockSdk::new());
        let client = live_client(&sdk).await;
        // dispose behind the binding's back
        client
            .with(|c| video_client_sdk::VideoClient::dispose(c))
            .await;
        let binding = PlayerUiBinding::new(Arc::clone(&sdk));

        let err = binding.acquire(&client, MANIFEST).await.unwrap_err();
        assert!(matches!(err, Error::Player(SdkError::Disposed)), "{err:?}");
        assert_eq!(binding.phase().await, Phase::Absent);
    }

    #[tokio::test]
    async fn release_disposes() {
        let sdk = Arc::new(MockSdk::new());
        let client = live_client(&sdk).await;
        let binding = PlayerUiBinding::new(Arc::clone(&sdk));
        binding.acquire(&client, MANIFEST).await.unwrap();
        assert_eq!(sdk.live_player_uis(), 1);

        assert!(binding.release().await);
        assert!(!binding.release().await);
        assert_eq!(sdk.live_player_uis(), 0);

        assert!(binding.acquire(&client, MANIFEST).await.unwrap());
        assert_eq!(sdk.live_player_uis(), 1);
        assert_eq!(sdk.peak_player_uis(), 1);
    }
}
