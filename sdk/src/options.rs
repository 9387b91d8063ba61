//! Construction options handed to the SDK.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Error produced by a [`TokenGetter`].
pub type TokenError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A pending token request.
pub type TokenFuture = Pin<Box<dyn Future<Output = Result<String, TokenError>> + Send>>;

/// Callback the connection layer invokes whenever it needs a fresh session token.
///
/// The SDK may call this any number of times over the lifetime of a client; every call is
/// expected to produce a new token.
pub type TokenGetter = Arc<dyn Fn() -> TokenFuture + Send + Sync>;

/// Options for [`Sdk::create_client`](crate::Sdk::create_client).
#[derive(Clone)]
pub struct VideoClientOptions {
    /// Backend base URLs the connection layer may use, in order of preference.
    pub backend_endpoints: Vec<String>,
    pub user_id: String,
    /// Only needed for broadcasting; playback does not authenticate.
    pub token: Option<TokenGetter>,
    /// Span the client logs under.
    pub logger: Option<tracing::Span>,
}

impl VideoClientOptions {
    pub fn new(backend_endpoints: Vec<String>, user_id: impl Into<String>) -> Self {
        Self {
            backend_endpoints,
            user_id: user_id.into(),
            token: None,
            logger: None,
        }
    }

    pub fn with_token(mut self, token: TokenGetter) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_logger(mut self, logger: tracing::Span) -> Self {
        self.logger = Some(logger);
        self
    }
}

// Manual Debug implementation since the token getter is a boxed closure
impl std::fmt::Debug for VideoClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoClientOptions")
            .field("backend_endpoints", &self.backend_endpoints)
            .field("user_id", &self.user_id)
            .field("token", &self.token.is_some())
            .field("logger", &self.logger)
            .finish()
    }
}

/// Options for [`VideoClient::request_player`](crate::VideoClient::request_player).
///
/// The demo always plays with the SDK's defaults.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct PlayerOptions {}
