//! Access-token issuance for broadcaster sessions.
//!
//! The SDK's connection layer authenticates with a short-lived bearer token, which it obtains
//! through a [`TokenGetter`] whenever its session needs (re-)authenticating. [`token_refresher`]
//! builds that getter on top of [`fetch_token`], which performs one `POST` to the demo
//! backend's access-token endpoint per call. Nothing is cached: every call fetches anew.

use crate::Error;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use video_client_sdk::{TokenError, TokenFuture, TokenGetter};

/// Body of a token request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub scopes: Vec<String>,
    pub user_id: String,
    pub data: TokenRequestData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequestData {
    pub display_name: String,
    /// Where the broadcast should be ingested.
    pub mirrors: Vec<Mirror>,
}

/// Routing descriptor identifying where a broadcast is ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mirror {
    pub id: String,
    pub stream_name: String,
    pub kind: MirrorKind,
    pub client_encoder: String,
    pub stream_key: String,
    pub client_referrer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorKind {
    Pipe,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Build the HTTP client used for token requests.
///
/// Cookies are kept across requests, so that the backend's session cookie accompanies every
/// token request, and redirects are never followed.
pub fn http_client() -> Result<reqwest::Client, Error> {
    Ok(reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()?)
}

/// Request a bearer token from `auth_url`.
///
/// Fails with [`Error::AuthFailure`] for any status other than `200 OK`. Failures are left to
/// the caller to report.
#[instrument(skip(http, request), fields(user_id = %request.user_id))]
pub async fn fetch_token(
    http: &reqwest::Client,
    auth_url: &str,
    request: &TokenRequest,
) -> Result<String, Error> {
    let response = http.post(auth_url).json(request).send().await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(Error::AuthFailure { status });
    }

    let body: TokenResponse = response.json().await?;
    Ok(body.token)
}

/// Credentials for one broadcaster session.
///
/// Only the auth URL, scope, and stream key are required; everything else falls back to the
/// stream key or to `"demo"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRefresherOptions {
    pub auth_url: String,
    pub stream_key: String,
    pub scope: String,
    pub display_name: Option<String>,
    pub user_id: Option<String>,
    pub client_referrer: Option<String>,
    pub stream_name: Option<String>,
}

impl TokenRefresherOptions {
    pub fn new(
        auth_url: impl Into<String>,
        scope: impl Into<String>,
        stream_key: impl Into<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            stream_key: stream_key.into(),
            scope: scope.into(),
            display_name: None,
            user_id: None,
            client_referrer: None,
            stream_name: None,
        }
    }

    /// The request body these credentials produce.
    pub fn request(&self) -> TokenRequest {
        TokenRequest {
            scopes: vec![self.scope.clone()],
            user_id: self
                .user_id
                .clone()
                .unwrap_or_else(|| self.stream_key.clone()),
            data: TokenRequestData {
                display_name: self
                    .display_name
                    .clone()
                    .unwrap_or_else(|| self.stream_key.clone()),
                mirrors: vec![Mirror {
                    id: self.stream_key.clone(),
                    stream_name: self
                        .stream_name
                        .clone()
                        .unwrap_or_else(|| "demo".to_string()),
                    kind: MirrorKind::Pipe,
                    client_encoder: "demo".to_string(),
                    stream_key: self.stream_key.clone(),
                    client_referrer: self
                        .client_referrer
                        .clone()
                        .unwrap_or_else(|| "demo".to_string()),
                }],
            },
        }
    }
}

/// Wrap [`fetch_token`] into a [`TokenGetter`] for the SDK.
///
/// Failures are logged and then handed on to the connection layer, which owns any retry policy.
pub fn token_refresher(options: TokenRefresherOptions, http: reqwest::Client) -> TokenGetter {
    let options = Arc::new(options);
    Arc::new(move || -> TokenFuture {
        let options = Arc::clone(&options);
        let http = http.clone();
        Box::pin(async move {
            let request = options.request();
            fetch_token(&http, &options.auth_url, &request)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, stream_key = %options.stream_key, "error fetching token");
                    TokenError::from(e)
                })
        })
    })
}

/// A random version 4 UUID, formatted as `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx`.
pub fn uuidv4() -> String {
    uuid::Uuid::new_v4().to_string()
}
