use video_client_sdk::SdkError;

/// Errors surfaced by the demo's orchestration layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The token endpoint answered with anything but `200 OK`.
    #[error("Unable to get token")]
    AuthFailure { status: reqwest::StatusCode },

    #[error("token request failed")]
    Http(#[from] reqwest::Error),

    #[error("media device acquisition failed")]
    DeviceAcquisition(#[source] SdkError),

    #[error("player request failed")]
    Player(#[source] SdkError),
}
