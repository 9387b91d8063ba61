//! Stream webhook processing.
//!
//! The streaming platform periodically reports every program it runs, with every stream in it
//! and the token that stream was opened with. The demo backend approves everything, echoes each
//! token back, attaches the app data of the user a token belongs to, and uses `polling` reports
//! to keep track of who is watching which stream.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

/// Free-form data attached to a token, keyed by `user.id`, `user.name` and `user.scope`.
pub type AppData = BTreeMap<String, String>;

pub const USER_ID: &str = "user.id";
pub const USER_NAME: &str = "user.name";
pub const USER_SCOPE: &str = "user.scope";

/// The `user.id` given to tokens that belong to no known user.
pub const UNKNOWN_USER: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub programs: BTreeMap<String, Program>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Program {
    #[serde(deserialize_with = "null_as_default")]
    pub streams: BTreeMap<String, Stream>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Stream {
    #[serde(deserialize_with = "null_as_default")]
    pub token: Token,
    #[serde(deserialize_with = "null_as_default")]
    pub view_tokens: Vec<Token>,
}

/// The platform sends `null` for empty collections.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Token {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// What the holder is doing: `joining`, `creating`, `polling`, ...
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebhookResponse {
    pub programs: BTreeMap<String, ProgramResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramResponse {
    pub stop: bool,
    pub need_auth: bool,
    pub streams: BTreeMap<String, StreamResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
    pub stop: bool,
    pub need_auth: bool,
    pub token: String,
    pub app_data: AppData,
    pub view_tokens: BTreeMap<String, ViewTokenResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTokenResponse {
    pub stop: bool,
    pub app_data: AppData,
}

/// Maps token values to the users they were issued to.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    users: HashMap<String, AppData>,
}

fn user(id: &str, name: &str, scope: &str) -> AppData {
    AppData::from([
        (USER_ID.to_string(), id.to_string()),
        (USER_NAME.to_string(), name.to_string()),
        (USER_SCOPE.to_string(), scope.to_string()),
    ])
}

impl Default for UserDirectory {
    /// The demo's canned users.
    fn default() -> Self {
        Self::from_iter([
            (
                "broadcaster_token_123",
                user("broadcaster123", "John Broadcaster", "broadcaster"),
            ),
            ("viewer_token_456", user("viewer456", "Jane Viewer", "viewer")),
            ("viewer_token_789", user("viewer789", "Bob Watcher", "viewer")),
        ])
    }
}

impl<K: Into<String>> FromIterator<(K, AppData)> for UserDirectory {
    fn from_iter<I: IntoIterator<Item = (K, AppData)>>(iter: I) -> Self {
        Self {
            users: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl UserDirectory {
    /// App data for the holder of `token`.
    ///
    /// Unknown tokens get an `unknown` viewer named after the token value.
    pub fn user_data(&self, token: &Token) -> AppData {
        self.users
            .get(&token.value)
            .cloned()
            .unwrap_or_else(|| user(UNKNOWN_USER, &token.value, "viewer"))
    }
}

/// Who was watching each stream as of its latest `polling` report.
#[derive(Debug, Default)]
pub struct ViewerRegistry {
    by_stream: Mutex<HashMap<String, Vec<String>>>,
}

impl ViewerRegistry {
    /// Viewers of `stream_id`, in the order they were first reported. Empty if nothing is known.
    pub async fn viewers(&self, stream_id: &str) -> Vec<String> {
        self.by_stream
            .lock()
            .await
            .get(stream_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn replace(&self, stream_id: &str, viewers: Vec<String>) {
        self.by_stream
            .lock()
            .await
            .insert(stream_id.to_string(), viewers);
    }
}

#[derive(Debug, Default)]
pub struct WebhookProcessor {
    users: UserDirectory,
    viewers: ViewerRegistry,
}

impl WebhookProcessor {
    pub fn new(users: UserDirectory) -> Self {
        Self {
            users,
            viewers: ViewerRegistry::default(),
        }
    }

    pub fn viewers(&self) -> &ViewerRegistry {
        &self.viewers
    }

    /// Approve every program and stream in `request`.
    pub async fn process(&self, request: &WebhookRequest) -> WebhookResponse {
        let mut response = WebhookResponse::default();
        for (program_id, program) in &request.programs {
            let mut streams = BTreeMap::new();
            for (stream_id, stream) in &program.streams {
                streams.insert(stream_id.clone(), self.process_stream(stream_id, stream).await);
            }
            response.programs.insert(
                program_id.clone(),
                ProgramResponse {
                    stop: false,
                    need_auth: true,
                    streams,
                },
            );
        }
        response
    }

    async fn process_stream(&self, stream_id: &str, stream: &Stream) -> StreamResponse {
        let mut response = StreamResponse {
            stop: false,
            need_auth: true,
            // every token is accepted as-is
            token: stream.token.value.clone(),
            app_data: AppData::new(),
            view_tokens: BTreeMap::new(),
        };

        match stream.token.action.as_str() {
            "creating" => response.app_data = self.users.user_data(&stream.token),
            "polling" => {
                let mut viewers = Vec::new();
                for view_token in &stream.view_tokens {
                    let app_data = self.users.user_data(view_token);
                    if let Some(id) = app_data.get(USER_ID)
                        && id != UNKNOWN_USER
                        && !viewers.contains(id)
                    {
                        viewers.push(id.clone());
                    }
                    response.view_tokens.insert(
                        view_token.value.clone(),
                        ViewTokenResponse {
                            stop: false,
                            app_data,
                        },
                    );
                }
                tracing::debug!(stream_id, ?viewers, "viewers polled");
                self.viewers.replace(stream_id, viewers).await;
            }
            _ => {}
        }
        response
    }
}
