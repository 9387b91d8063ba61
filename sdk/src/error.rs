/// Failures reported by an SDK binding.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("permission to use media devices was denied")]
    PermissionDenied,

    #[error("media device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("video client has already been disposed")]
    Disposed,

    #[error("{0}")]
    Other(String),
}
