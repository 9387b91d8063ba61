//! Demo configuration.
//!
//! Every value has a built-in default matching the hosted demo backend, and can be overridden
//! from the command line or the environment.

use crate::auth::TokenRefresherOptions;

/// Base URL of the demo backend, used both by the SDK's connection layer and for token issuance.
pub const BACKEND_ENDPOINT: &str = "https://umbrella.dev1.devspace.lsea4.livelyvideo.tv";

/// Path of the access-token endpoint, relative to [`BACKEND_ENDPOINT`].
pub const ACCESS_TOKEN_PATH: &str = "/apps/demos/api/demo/v1/access-token";

pub const DEMO_USER_ID: &str = "demo";

/// Scope requested for broadcaster sessions.
pub const BROADCASTER_SCOPE: &str = "conference-owner";

pub const DEMO_STREAM_NAME: &str = "demo";

#[derive(Debug, Clone, clap::Args)]
pub struct DemoConfig {
    /// Backend base URL.
    #[arg(long, env = "BACKEND_ENDPOINT", default_value = BACKEND_ENDPOINT)]
    pub backend_endpoint: String,

    /// User id presented to the backend.
    #[arg(long, env = "VDC_USER_ID", default_value = DEMO_USER_ID)]
    pub user_id: String,

    /// Scope requested for broadcaster tokens.
    #[arg(long, default_value = BROADCASTER_SCOPE)]
    pub scope: String,

    /// Stream name used when joining a broadcast.
    #[arg(long, default_value = DEMO_STREAM_NAME)]
    pub stream_name: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            backend_endpoint: BACKEND_ENDPOINT.to_string(),
            user_id: DEMO_USER_ID.to_string(),
            scope: BROADCASTER_SCOPE.to_string(),
            stream_name: DEMO_STREAM_NAME.to_string(),
        }
    }
}

impl DemoConfig {
    /// The endpoint list handed to the SDK.
    pub fn backend_endpoints(&self) -> Vec<String> {
        vec![self.backend_endpoint.clone()]
    }

    /// Full URL of the access-token endpoint.
    pub fn auth_url(&self) -> String {
        format!(
            "{}{ACCESS_TOKEN_PATH}",
            self.backend_endpoint.trim_end_matches('/')
        )
    }

    /// Token credentials for a broadcaster publishing under `stream_key`.
    pub fn broadcaster_credentials(&self, stream_key: impl Into<String>) -> TokenRefresherOptions {
        let mut credentials = TokenRefresherOptions::new(self.auth_url(), &self.scope, stream_key);
        credentials.stream_name = Some(self.stream_name.clone());
        credentials
    }
}
