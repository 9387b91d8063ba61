//! The demo backend.
//!
//! A small HTTP/1 server that answers the streaming platform's webhook and lets front-ends ask
//! who is watching a call:
//!
//! - `POST /webhook` takes a [`WebhookRequest`] and answers with a [`WebhookResponse`](crate::webhook::WebhookResponse).
//! - `GET /viewers-watching?callId=<id>` answers `{"callId": <id>, "viewers": [...]}`.
//!
//! Errors are plain-text bodies terminated by a newline.

use crate::webhook::{WebhookProcessor, WebhookRequest};
use bytes::Bytes;
use eyre::Context;
use http::header::{self, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::instrument;

pub const DEFAULT_PORT: u16 = 3005;

#[derive(Debug, Clone, clap::Args)]
pub struct BackendConfig {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Bind to `config.port` on all interfaces and serve until the process is stopped.
pub async fn run(config: &BackendConfig, processor: Arc<WebhookProcessor>) -> eyre::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind to {addr}"))?;
    tracing::info!(%addr, "demo backend listening");
    serve(listener, processor).await
}

/// Serve connections from `listener`, one task per connection.
pub async fn serve(listener: TcpListener, processor: Arc<WebhookProcessor>) -> eyre::Result<()> {
    loop {
        let (conn, peer) = listener.accept().await.context("accept")?;
        let conn = hyper_util::rt::TokioIo::new(conn);
        let processor = Arc::clone(&processor);
        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let processor = Arc::clone(&processor);
                async move { Ok::<_, Infallible>(route(&processor, req).await) }
            });
            if let Err(e) = http1::Builder::new()
                .serve_connection(conn, service)
                .await
            {
                tracing::warn!(%peer, error = %e, "connection ended with an error");
            }
        });
    }
}

/// Dispatch one request.
#[instrument(skip_all, fields(method = %req.method(), path = req.uri().path()))]
pub async fn route<B>(processor: &WebhookProcessor, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let response = match req.uri().path() {
        "/webhook" if req.method() == Method::POST => webhook(processor, req).await,
        "/viewers-watching" if req.method() == Method::GET => {
            viewers_watching(processor, req.uri().query()).await
        }
        "/webhook" | "/viewers-watching" => status_only(StatusCode::METHOD_NOT_ALLOWED),
        _ => error(StatusCode::NOT_FOUND, "404 page not found"),
    };
    tracing::debug!(status = %response.status(), "handled");
    response
}

async fn webhook<B>(processor: &WebhookProcessor, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let body = match req.into_body().collect().await {
        Ok(body) => body.to_bytes(),
        Err(e) => {
            tracing::warn!(error = %e, "could not read webhook body");
            return error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error reading request body",
            );
        }
    };
    tracing::debug!(payload = %String::from_utf8_lossy(&body), "received webhook");

    let request: WebhookRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "malformed webhook body");
            return error(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };
    json(&processor.process(&request).await)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewersWatching {
    call_id: String,
    viewers: Vec<String>,
}

async fn viewers_watching(processor: &WebhookProcessor, query: Option<&str>) -> Response<Full<Bytes>> {
    let call_id = form_urlencoded::parse(query.unwrap_or("").as_bytes())
        .find(|(k, _)| k == "callId")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();
    if call_id.is_empty() {
        return error(
            StatusCode::BAD_REQUEST,
            "A valid callId is required as a query parameter.",
        );
    }
    let viewers = processor.viewers().viewers(&call_id).await;
    json(&ViewersWatching { call_id, viewers })
}

fn json(body: &impl Serialize) -> Response<Full<Bytes>> {
    let mut body = serde_json::to_vec(body).expect("backend responses always serialize");
    body.push(b'\n');
    let mut response = Response::new(Full::from(body));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

fn status_only(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::default());
    *response.status_mut() = status;
    response
}

fn error(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::from(format!("{message}\n")));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn request(method: Method, uri: &str, body: impl Into<Bytes>) -> Request<Full<Bytes>> {
        let mut req = Request::new(Full::new(body.into()));
        *req.method_mut() = method;
        *req.uri_mut() = uri.parse().unwrap();
        req
    }

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn content_type(response: &Response<Full<Bytes>>) -> &str {
        response.headers()[header::CONTENT_TYPE].to_str().unwrap()
    }

    #[tokio::test]
    async fn invalid_webhook_body() {
        let processor = WebhookProcessor::default();
        let response = route(&processor, request(Method::POST, "/webhook", "not json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(content_type(&response), "text/plain; charset=utf-8");
        assert_eq!(body_string(response).await, "Invalid request body\n");
    }

    #[tokio::test]
    async fn webhook_polling_feeds_viewers_watching() {
        let processor = WebhookProcessor::default();
        let body = json!({
            "programs": { "p": { "streams": { "call-1": {
                "token": { "value": "broadcaster_token_123", "type": "user", "action": "polling" },
                "viewTokens": [{ "value": "viewer_token_456", "type": "user", "action": "polling" }],
            }}}}
        });
        let response = route(
            &processor,
            request(Method::POST, "/webhook", body.to_string()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "application/json");
        let answer: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(
            answer["programs"]["p"]["streams"]["call-1"]["viewTokens"]["viewer_token_456"]["appData"]
                ["user.name"],
            "Jane Viewer"
        );

        let response = route(
            &processor,
            request(Method::GET, "/viewers-watching?callId=call-1", ""),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            "{\"callId\":\"call-1\",\"viewers\":[\"viewer456\"]}\n"
        );
    }

    #[tokio::test]
    async fn viewers_watching_unknown_call() {
        let processor = WebhookProcessor::default();
        let response = route(
            &processor,
            request(Method::GET, "/viewers-watching?callId=nobody%20here", ""),
        )
        .await;
        assert_eq!(
            body_string(response).await,
            "{\"callId\":\"nobody here\",\"viewers\":[]}\n"
        );
    }

    #[tokio::test]
    async fn viewers_watching_requires_call_id() {
        let processor = WebhookProcessor::default();
        for uri in ["/viewers-watching", "/viewers-watching?callId="] {
            let response = route(&processor, request(Method::GET, uri, "")).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(
                body_string(response).await,
                "A valid callId is required as a query parameter.\n"
            );
        }
    }

    #[tokio::test]
    async fn unknown_routes() {
        let processor = WebhookProcessor::default();
        let response = route(&processor, request(Method::GET, "/nope", "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = route(&processor, request(Method::GET, "/webhook", "")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert_eq!(body_string(response).await, "");
        let response = route(&processor, request(Method::POST, "/viewers-watching", "")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn serves_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener, Arc::new(WebhookProcessor::default())));

        let response = reqwest::get(format!("http://{addr}/viewers-watching?callId=x"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response.json::<serde_json::Value>().await.unwrap(),
            json!({ "callId": "x", "viewers": [] })
        );
        server.abort();
    }
}
