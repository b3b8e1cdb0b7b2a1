//! HTTP remote directory
//!
//! Talks to a JSON API:
//!
//! | call            | request                                        |
//! |-----------------|------------------------------------------------|
//! | list            | `GET  /entries`                                |
//! | insert          | `POST /entries` `{url}`                        |
//! | delete          | `POST /entries/delete` `{url}`                 |
//! | rename          | `POST /entries/rename` `{oldUrl, newUrl}`      |
//! | increment_click | `POST /entries/click` `{url}`                  |
//!
//! URLs travel in request bodies so they never need path encoding.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use super::RemoteDirectory;
use crate::error::{RemoteError, RemoteResult};
use crate::models::{Identity, RemoteRecord};

/// [`RemoteDirectory`] backed by an HTTP API
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDirectory {
    /// Create a client for the API rooted at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("clickmark/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach auth and a request id, send, and classify the status
    async fn send(&self, request: RequestBuilder, identity: &Identity) -> RemoteResult<Response> {
        let request_id = Uuid::new_v4().to_string();
        let response = request
            .bearer_auth(identity.token())
            .header("x-request-id", &request_id)
            .send()
            .await
            .map_err(|e| {
                warn!(%request_id, "request failed: {}", e);
                RemoteError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        debug!(%request_id, %status, url = %response.url(), "response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, body.trim()))
    }

    async fn post(&self, identity: &Identity, path: &str, body: serde_json::Value) -> RemoteResult<()> {
        let request = self.client.post(self.endpoint(path)).json(&body);
        self.send(request, identity).await.map(|_| ())
    }
}

/// Map a non-success status to the directory's failure kinds
///
/// Auth failures count as unavailable; other client errors mean the server
/// understood and declined.
fn classify_status(status: StatusCode, body: &str) -> RemoteError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unavailable(detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => RemoteError::Unavailable(detail),
        s if s.is_client_error() => RemoteError::Rejected(detail),
        _ => RemoteError::Unavailable(detail),
    }
}

#[async_trait]
impl RemoteDirectory for HttpDirectory {
    async fn list(&self, identity: &Identity) -> RemoteResult<Vec<RemoteRecord>> {
        let request = self.client.get(self.endpoint("entries"));
        let response = self.send(request, identity).await?;
        response
            .json::<Vec<RemoteRecord>>()
            .await
            .map_err(|e| RemoteError::Unavailable(format!("invalid entry list: {}", e)))
    }

    async fn insert(&self, identity: &Identity, url: &str) -> RemoteResult<()> {
        self.post(identity, "entries", json!({ "url": url })).await
    }

    async fn delete(&self, identity: &Identity, url: &str) -> RemoteResult<()> {
        self.post(identity, "entries/delete", json!({ "url": url })).await
    }

    async fn rename(&self, identity: &Identity, old_url: &str, new_url: &str) -> RemoteResult<()> {
        self.post(
            identity,
            "entries/rename",
            json!({ "oldUrl": old_url, "newUrl": new_url }),
        )
        .await
    }

    async fn increment_click(&self, identity: &Identity, url: &str) -> RemoteResult<()> {
        self.post(identity, "entries/click", json!({ "url": url })).await
    }
}
