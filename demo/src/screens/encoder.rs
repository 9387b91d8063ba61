//! The broadcaster screen.

use super::{Control, ControlBarVariant, Node};
use crate::bindings::video_client::broadcaster_options;
use crate::bindings::{CallStateBinding, EncoderUiBinding, VideoClientBinding};
use crate::config::DemoConfig;
use crate::lifecycle::{Lifecycle, Ticket};
use crate::logging::Logger;
use std::sync::Arc;
use tracing::instrument;
use video_client_sdk::Sdk;

pub struct EncoderScreen<S: Sdk> {
    config: DemoConfig,
    logger: Logger,
    http: reqwest::Client,
    activation: Lifecycle<()>,
    client: VideoClientBinding<S>,
    encoder_ui: EncoderUiBinding<S>,
    call_state: CallStateBinding<S>,
}

impl<S: Sdk> EncoderScreen<S> {
    pub fn new(sdk: Arc<S>, config: DemoConfig, logger: Logger, http: reqwest::Client) -> Self {
        Self {
            config,
            logger,
            http,
            activation: Lifecycle::new("encoder screen"),
            client: VideoClientBinding::new(Arc::clone(&sdk)),
            encoder_ui: EncoderUiBinding::new(Arc::clone(&sdk)),
            call_state: CallStateBinding::new(sdk),
        }
    }

    /// Show the screen: construct the client, acquire the local devices, then set up call state.
    ///
    /// If device acquisition fails the screen stays up without its bound controls. If the screen
    /// is deactivated while this is still in progress, whatever was acquired in the meantime is
    /// released again before this returns.
    #[instrument(skip_all)]
    pub async fn activate(&self) {
        let Some(ticket) = self.activation.begin().await else {
            tracing::debug!("encoder screen already active");
            return;
        };

        self.client
            .acquire(|| broadcaster_options(&self.config, &self.logger, &self.http))
            .await;
        if !self.activation.is_current(&ticket).await {
            return self.abandon(ticket).await;
        }

        if let Err(e) = self.encoder_ui.acquire().await {
            tracing::warn!(error = ?e, "could not acquire camera or microphone");
        }
        if !self.activation.is_current(&ticket).await {
            return self.abandon(ticket).await;
        }

        self.call_state.acquire().await;
        if !self.activation.commit(ticket, (), drop).await {
            self.release_bindings().await;
        }
    }

    async fn abandon(&self, ticket: Ticket<()>) {
        tracing::debug!("encoder screen deactivated during activation");
        self.release_bindings().await;
        self.activation.abort(ticket).await;
    }

    /// Take the screen down, releasing everything in reverse order of acquisition.
    #[instrument(skip_all)]
    pub async fn deactivate(&self) {
        self.activation.release(drop).await;
        self.release_bindings().await;
    }

    async fn release_bindings(&self) {
        self.call_state.release().await;
        self.encoder_ui.release().await;
        self.client.release().await;
    }

    /// The screen's control tree. Empty until client, encoder UI state and call state are all live.
    pub async fn render(&self) -> Vec<Node> {
        if !(self.client.is_ready().await
            && self.encoder_ui.is_ready().await
            && self.call_state.is_ready().await)
        {
            return Vec::new();
        }
        vec![Node::MediaContainer(vec![
            Node::Control(Control::EncoderVideo),
            Node::ControlBar {
                variant: ControlBarVariant::Encoder,
                children: vec![
                    Node::JoinBroadcastButton {
                        stream_name: self.config.stream_name.clone(),
                    },
                    Node::Control(Control::CameraButton),
                    Node::Control(Control::MicrophoneButton),
                    Node::Control(Control::FullscreenButton),
                    Node::Control(Control::SettingsButton),
                ],
            },
            Node::SettingsSidebar(vec![
                Node::Control(Control::EncoderVideoDeviceSelect),
                Node::Control(Control::EncoderAudioDeviceSelect),
                Node::Control(Control::EncoderResolutionSelect),
                Node::Control(Control::TestMicButton),
            ]),
        ])]
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    pub fn client(&self) -> &VideoClientBinding<S> {
        &self.client
    }

    pub fn encoder_ui(&self) -> &EncoderUiBinding<S> {
        &self.encoder_ui
    }

    pub fn call_state(&self) -> &CallStateBinding<S> {
        &self.call_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::http_client;
    use crate::lifecycle::Phase;
    use pretty_assertions::assert_eq;
    use video_client_sdk::mock::MockSdk;

    fn screen(sdk: &Arc<MockSdk>) -> EncoderScreen<MockSdk> {
        EncoderScreen::new(
            Arc::clone(sdk),
            DemoConfig::default(),
            Logger::for_video_client(),
            http_client().unwrap(),
        )
    }

    #[tokio::test]
    async fn renders_once_everything_is_live() {
        let sdk = Arc::new(MockSdk::new());
        let screen = screen(&sdk);
        assert_eq!(screen.render().await, vec![]);

        screen.activate().await;
        let layout = screen.render().await;
        assert_eq!(layout.len(), 1);
        assert!(layout[0].contains(Control::EncoderVideo));
        assert!(layout[0].contains(Control::TestMicButton));
        assert_eq!(
            layout[0].to_string(),
            "\
MediaContainer
  EncoderVideo
  ControlBar Encoder
    JoinBroadcastButton streamName=\"demo\"
    CameraButton
    MicrophoneButton
    FullscreenButton
    SettingsButton
  SettingsSidebar
    EncoderVideoDeviceSelect
    EncoderAudioDeviceSelect
    EncoderResolutionSelect
    TestMicButton
"
        );

        screen.deactivate().await;
        assert_eq!(screen.render().await, vec![]);
        assert_eq!(screen.client().phase().await, Phase::Disposed);
        assert_eq!(screen.encoder_ui().phase().await, Phase::Disposed);
        assert_eq!(screen.call_state().phase().await, Phase::Disposed);
    }

    #[tokio::test]
    async fn activate_twice_is_a_no_op() {
        let sdk = Arc::new(MockSdk::new());
        let screen = screen(&sdk);
        screen.activate().await;
        screen.activate().await;
        assert_eq!(sdk.peak_clients(), 1);
        assert_eq!(sdk.peak_controllers(), 1);
    }

    #[tokio::test]
    async fn denied_devices_render_nothing() {
        let sdk = Arc::new(MockSdk::new());
        sdk.deny_devices();
        let screen = screen(&sdk);
        screen.activate().await;

        assert_eq!(screen.render().await, vec![]);
        assert!(screen.client().is_ready().await);
        assert!(screen.call_state().is_ready().await);
        assert_eq!(screen.encoder_ui().phase().await, Phase::Absent);

        screen.deactivate().await;
        assert_eq!(sdk.live_clients(), 0);
    }
}
