use std::future::Future;

use reqwest::header::COOKIE;

use super::ControllerError;
use crate::auth::session::SESSION_COOKIE;

/// What the controller needs from an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    /// Empty for non-success replies; their body is never read.
    pub body: String,
}

impl HttpReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues the toggle request. `Err` means the request never produced a
/// response (connection refused, reset, aborted).
pub trait LikeClient: Send + Sync {
    fn get(&self, path: &str) -> impl Future<Output = Result<HttpReply, ControllerError>> + Send;
}

/// [`LikeClient`] that talks to a running blog server.
#[derive(Debug, Clone)]
pub struct HttpLikeClient {
    base_url: String,
    session: Option<String>,
    http: reqwest::Client,
}

impl HttpLikeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: None,
            http: reqwest::Client::new(),
        }
    }

    /// Sends requests as the owner of this session token.
    pub fn with_session(mut self, token: impl Into<String>) -> Self {
        self.session = Some(token.into());
        self
    }
}

impl LikeClient for HttpLikeClient {
    async fn get(&self, path: &str) -> Result<HttpReply, ControllerError> {
        // The path is used verbatim.
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.http.get(&url);
        if let Some(token) = &self.session {
            request = request.header(COOKIE, format!("{SESSION_COOKIE}={token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ControllerError::Transport(crate::unpack_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(HttpReply::status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ControllerError::Transport(crate::unpack_error(&e)))?;

        Ok(HttpReply {
            status: status.as_u16(),
            body,
        })
    }
}
