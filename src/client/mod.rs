//! HTTP client for the dashboard.
//!
//! [`ApiClient`] keeps the `access_token` cookie in its own cookie store, so a
//! successful [`ApiClient::sign_in`] authenticates every later call.
//! [`session::SessionState`] and [`sidebar::Sidebar`] hold the client-side
//! state the dashboard renders from.

pub mod session;
pub mod sidebar;
pub mod types;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use self::types::{MessageEnvelope, ProfileUpdate, SessionUser, SigninBody, UserEnvelope};
use crate::APP_USER_AGENT;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed ({status}): {message}")]
    Api { status: StatusCode, message: String },
}

impl ClientError {
    /// Server-provided message for API errors, the error text otherwise.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    message: String,
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
}

impl ApiClient {
    /// # Errors
    /// Returns an error if `base_url` is not a URL or the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)?;
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { base_url, http })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    /// Sign in and keep the session cookie for later calls.
    ///
    /// # Errors
    /// Returns the server message on 4xx/5xx, or a transport error.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionUser, ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/signin")?)
            .json(&SigninBody { email, password })
            .send()
            .await?;
        let envelope: UserEnvelope = read_json(response).await?;
        Ok(envelope.user)
    }

    /// Ask the server to clear the session cookie; returns its message.
    ///
    /// # Errors
    /// Returns the server message on 4xx/5xx, or a transport error.
    pub async fn sign_out(&self) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("/api/user/signout")?)
            .send()
            .await?;
        let envelope: MessageEnvelope = read_json(response).await?;
        Ok(envelope.message)
    }

    /// # Errors
    /// Returns the server message on 4xx/5xx, or a transport error.
    pub async fn fetch_user(&self, user_id: &str) -> Result<SessionUser, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/user/{user_id}"))?)
            .send()
            .await?;
        read_json(response).await
    }

    /// # Errors
    /// Returns the server message on 4xx/5xx, or a transport error.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<SessionUser, ClientError> {
        let response = self
            .http
            .put(self.url(&format!("/api/user/{user_id}"))?)
            .json(update)
            .send()
            .await?;
        let envelope: UserEnvelope = read_json(response).await?;
        Ok(envelope.user)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Request failed").to_string());
    debug!(%status, "API request failed: {message}");
    Err(ClientError::Api { status, message })
}
