//! The connection-level video client of a screen.
//!
//! Broadcasting and playback construct their clients differently: a broadcaster's client
//! carries a token getter (see [`broadcaster_options`]), a player's does not
//! (see [`player_options`]). Either way a screen holds at most one live client, and a disposed
//! client is never reused.

use crate::auth::{token_refresher, uuidv4};
use crate::config::DemoConfig;
use crate::lifecycle::{Lifecycle, Phase};
use crate::logging::Logger;
use std::sync::Arc;
use tracing::instrument;
use video_client_sdk::{PlayerOptions, Sdk, SdkError, VideoClient, VideoClientOptions};

/// Client options for a broadcaster session.
///
/// Every call mints a new stream key, so every client gets credentials of its own.
pub fn broadcaster_options(
    config: &DemoConfig,
    logger: &Logger,
    http: &reqwest::Client,
) -> VideoClientOptions {
    let stream_key = uuidv4();
    tracing::debug!(%stream_key, "new broadcaster session");
    let token = token_refresher(config.broadcaster_credentials(stream_key), http.clone());

    VideoClientOptions::new(config.backend_endpoints(), &config.user_id)
        .with_token(token)
        .with_logger(logger.span())
}

/// Client options for playback, which needs no token.
pub fn player_options(config: &DemoConfig) -> VideoClientOptions {
    VideoClientOptions::new(config.backend_endpoints(), &config.user_id)
}

pub struct VideoClientBinding<S: Sdk> {
    sdk: Arc<S>,
    slot: Lifecycle<S::Client>,
}

impl<S: Sdk> VideoClientBinding<S> {
    pub fn new(sdk: Arc<S>) -> Self {
        Self {
            sdk,
            slot: Lifecycle::new("video client"),
        }
    }

    /// Construct a client unless one is already live.
    ///
    /// `options` is only evaluated when a client is actually constructed. Returns whether one
    /// was.
    #[instrument(skip_all)]
    pub async fn acquire(&self, options: impl FnOnce() -> VideoClientOptions) -> bool {
        let created = self
            .slot
            .acquire(
                || self.sdk.create_client(options()),
                |mut client| client.dispose(),
            )
            .await;
        if created {
            tracing::debug!("video client constructed");
        }
        created
    }

    /// Dispose the client, if there is one.
    #[instrument(skip_all)]
    pub async fn release(&self) -> bool {
        self.slot.release(|mut client| client.dispose()).await
    }

    /// Ask the live client for a player.
    ///
    /// Returns `None` if there is no live client.
    pub async fn request_player(
        &self,
        manifest_url: &str,
        options: &PlayerOptions,
    ) -> Option<Result<<S::Client as VideoClient>::Player, SdkError>> {
        self.slot
            .with(|client| client.request_player(manifest_url, options))
            .await
    }

    /// Run `f` against the live client.
    pub async fn with<R>(&self, f: impl FnOnce(&mut S::Client) -> R) -> Option<R> {
        self.slot.with(f).await
    }

    pub async fn phase(&self) -> Phase {
        self.slot.phase().await
    }

    pub async fn is_ready(&self) -> bool {
        self.slot.is_ready().await
    }
}
