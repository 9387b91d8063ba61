//! The playback screen.
//!
//! The user types a manifest URL and submits it. Each distinct non-empty URL gets its own player
//! UI state; the previous one is disposed first.

use super::{Control, ControlBarVariant, Node};
use crate::Error;
use crate::bindings::video_client::player_options;
use crate::bindings::{PlayerUiBinding, VideoClientBinding};
use crate::config::DemoConfig;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;
use video_client_sdk::Sdk;

pub const HEADING: &str = "Please provide a valid manifest URL.";
pub const INPUT_PLACEHOLDER: &str = "Enter manifest URL";
pub const SUBMIT_LABEL: &str = "Set Manifest URL";

pub struct ManifestScreen<S: Sdk> {
    config: DemoConfig,
    client: VideoClientBinding<S>,
    player_ui: PlayerUiBinding<S>,
    input: Mutex<String>,
    manifest_url: Mutex<String>,
}

impl<S: Sdk> ManifestScreen<S> {
    pub fn new(sdk: Arc<S>, config: DemoConfig) -> Self {
        Self {
            config,
            client: VideoClientBinding::new(Arc::clone(&sdk)),
            player_ui: PlayerUiBinding::new(sdk),
            input: Mutex::default(),
            manifest_url: Mutex::default(),
        }
    }

    /// Show the screen, constructing the client and, if a manifest URL was already submitted,
    /// its player.
    #[instrument(skip_all)]
    pub async fn activate(&self) {
        self.client
            .acquire(|| player_options(&self.config))
            .await;
        let url = self.manifest_url.lock().await.clone();
        if let Err(e) = self.player_ui.acquire(&self.client, &url).await {
            tracing::warn!(error = ?e, manifest_url = %url, "could not create player");
        }
    }

    /// Update the text field. Nothing else happens until [`ManifestScreen::submit`].
    pub async fn set_input(&self, value: impl Into<String>) {
        *self.input.lock().await = value.into();
    }

    /// Make the text field's contents the manifest URL.
    ///
    /// Resubmitting the current URL does nothing. Otherwise the previous player UI state is
    /// disposed, and a new one is created if the URL is non-empty. Returns whether a new player
    /// UI state was created.
    #[instrument(skip_all, err)]
    pub async fn submit(&self) -> Result<bool, Error> {
        let url = self.input.lock().await.clone();
        {
            let mut current = self.manifest_url.lock().await;
            if *current == url {
                return Ok(false);
            }
            current.clone_from(&url);
        }
        tracing::debug!(manifest_url = %url, "manifest url changed");
        self.player_ui.release().await;
        self.player_ui.acquire(&self.client, &url).await
    }

    #[instrument(skip_all)]
    pub async fn deactivate(&self) {
        self.player_ui.release().await;
        self.client.release().await;
    }

    pub async fn manifest_url(&self) -> String {
        self.manifest_url.lock().await.clone()
    }

    /// The screen's control tree.
    ///
    /// The form is always there; the player is only rendered once a manifest URL was submitted
    /// and player UI state is live for it.
    pub async fn render(&self) -> Vec<Node> {
        let mut nodes = vec![
            Node::Heading(HEADING.to_string()),
            Node::TextInput {
                placeholder: INPUT_PLACEHOLDER.to_string(),
                value: self.input.lock().await.clone(),
            },
            Node::Button(SUBMIT_LABEL.to_string()),
        ];
        if !self.manifest_url.lock().await.is_empty() && self.player_ui.is_ready().await {
            nodes.push(Node::MediaContainer(vec![
                Node::Control(Control::PlayerGetSoundButton),
                Node::Control(Control::PlayerVideo),
                Node::ControlBar {
                    variant: ControlBarVariant::Player,
                    children: vec![
                        Node::Control(Control::PlayerPlayButton),
                        Node::Control(Control::PlayerAudioButton),
                        Node::Control(Control::PlayerVolumeRange),
                        Node::Control(Control::PlayerBitrateButton),
                        Node::Control(Control::PlayerFullscreenButton),
                    ],
                },
                Node::Control(Control::PlayerOverlayButton),
            ]));
        }
        nodes
    }

    pub fn client(&self) -> &VideoClientBinding<S> {
        &self.client
    }

    pub fn player_ui(&self) -> &PlayerUiBinding<S> {
        &self.player_ui
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use video_client_sdk::mock::MockSdk;

    #[tokio::test]
    async fn form_is_always_rendered() {
        let sdk = Arc::new(MockSdk::new());
        let screen = ManifestScreen::new(Arc::clone(&sdk), DemoConfig::default());
        screen.activate().await;
        screen.set_input("typing").await;

        assert_eq!(
            screen.render().await,
            vec![
                Node::Heading(HEADING.to_string()),
                Node::TextInput {
                    placeholder: INPUT_PLACEHOLDER.to_string(),
                    value: "typing".to_string(),
                },
                Node::Button(SUBMIT_LABEL.to_string()),
            ]
        );
        assert_eq!(sdk.live_player_uis(), 0);
    }

    #[tokio::test]
    async fn submit_renders_player() {
        let sdk = Arc::new(MockSdk::new());
        let screen = ManifestScreen::new(Arc::clone(&sdk), DemoConfig::default());
        screen.activate().await;
        screen
            .set_input("https://example.com/manifest.m3u8")
            .await;
        assert!(screen.submit().await.unwrap());
        assert!(!screen.submit().await.unwrap());

        let layout = screen.render().await;
        assert_eq!(layout.len(), 4);
        assert!(layout[3].contains(Control::PlayerOverlayButton));
        assert!(layout[3].contains(Control::PlayerBitrateButton));
    }

    #[tokio::test]
    async fn clearing_the_url_removes_the_player() {
        let sdk = Arc::new(MockSdk::new());
        let screen = ManifestScreen::new(Arc::clone(&sdk), DemoConfig::default());
        screen.activate().await;
        screen.set_input("https://example.com/a.m3u8").await;
        screen.submit().await.unwrap();
        screen.set_input("").await;

        assert!(!screen.submit().await.unwrap());
        assert_eq!(sdk.live_player_uis(), 0);
        assert_eq!(screen.render().await.len(), 3);
    }

    #[tokio::test]
    async fn submitted_url_survives_reactivation() {
        let sdk = Arc::new(MockSdk::new());
        let screen = ManifestScreen::new(Arc::clone(&sdk), DemoConfig::default());
        screen.activate().await;
        screen.set_input("https://example.com/a.m3u8").await;
        screen.submit().await.unwrap();

        screen.deactivate().await;
        assert_eq!(sdk.live_clients(), 0);
        assert_eq!(sdk.live_player_uis(), 0);

        screen.activate().await;
        assert_eq!(sdk.live_clients(), 1);
        assert_eq!(sdk.live_player_uis(), 1);
        assert_eq!(screen.manifest_url().await, "https://example.com/a.m3u8");
    }
}
