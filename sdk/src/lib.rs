//! The surface of the real-time video client SDK, as seen by a front-end.
//!
//! The SDK itself (media capture, encoding, adaptive bitrate, transport) is an opaque
//! collaborator. A front-end only ever touches it through a handful of entry points:
//!
//! - constructing and disposing a connection-level [`VideoClient`],
//! - asking a client for a [`VideoClient::Player`] given a manifest URL,
//! - initializing the device layer and requesting a [`MediaStreamController`],
//! - wrapping those engine objects in UI state holders ([`EncoderUiState`], [`CallState`],
//!   [`PlayerUiState`]) that must be explicitly released.
//!
//! [`Sdk`] ties these together so that orchestration code can be written once and run
//! against any binding of the SDK. With the `mock` feature enabled, [`mock::MockSdk`]
//! provides an in-memory, instrumented binding suitable for tests and dry runs.

use std::future::Future;

mod error;
pub use error::SdkError;

pub mod options;
pub use options::{PlayerOptions, TokenError, TokenFuture, TokenGetter, VideoClientOptions};

#[cfg(feature = "mock")]
pub mod mock;

/// Entry points of an SDK binding.
///
/// Each associated type is an engine object or a UI state holder. Constructors that the SDK
/// exposes as plain constructors (UI states) are synchronous; device acquisition suspends.
pub trait Sdk: Send + Sync {
    type Client: VideoClient;
    type Controller: MediaStreamController;
    type EncoderUi: EncoderUiState<Controller = Self::Controller>;
    type CallUi: CallState;
    type PlayerUi: PlayerUiState<Player = <Self::Client as VideoClient>::Player>;

    /// Construct a new connection-level client.
    fn create_client(&self, options: VideoClientOptions) -> Self::Client;

    /// Global device-layer initialization.
    ///
    /// Idempotent, and must complete before [`Sdk::request_controller`] is called.
    fn init_media(&self) -> impl Future<Output = Result<(), SdkError>> + Send;

    /// Acquire the local camera and microphone.
    fn request_controller(
        &self,
    ) -> impl Future<Output = Result<Self::Controller, SdkError>> + Send;

    /// Wrap a media stream controller in encoder UI state.
    fn encoder_ui(&self, controller: Self::Controller) -> Self::EncoderUi;

    /// Construct an empty call state.
    fn call_state(&self) -> Self::CallUi;

    /// Wrap a player in player UI state.
    fn player_ui(&self, player: <Self::Client as VideoClient>::Player) -> Self::PlayerUi;
}

/// A connection-level client.
///
/// Once [`VideoClient::dispose`] has been called the client must not be used again.
pub trait VideoClient: Send {
    type Player: Send;

    /// Request a player for the stream described by `manifest_url`.
    fn request_player(
        &self,
        manifest_url: &str,
        options: &PlayerOptions,
    ) -> Result<Self::Player, SdkError>;

    /// Release every network and session resource held by this client.
    fn dispose(&mut self);
}

/// Handle onto the local camera and microphone streams.
pub trait MediaStreamController: Send {
    fn close(&mut self, reason: &str);
}

/// Encoder UI state, owning a [`MediaStreamController`].
pub trait EncoderUiState: Send {
    type Controller: MediaStreamController;

    /// The controller this state wraps, if it has not been taken down yet.
    fn media_stream_controller(&mut self) -> Option<&mut Self::Controller>;

    fn dispose(&mut self, reason: &str);
}

/// Call state, owning the underlying call once a broadcast has been joined.
pub trait CallState: Send {
    type Call: Call;

    /// Stop any broadcast in progress. A no-op if nothing is being broadcast.
    fn stop_broadcast(&mut self);

    /// The live call, if one was ever established.
    fn call(&mut self) -> Option<&mut Self::Call>;

    fn dispose(&mut self);
}

/// An established call.
pub trait Call: Send {
    fn close(&mut self, reason: &str);
}

/// Player UI state, owning a player.
pub trait PlayerUiState: Send {
    type Player: Send;

    fn dispose(&mut self);
}
