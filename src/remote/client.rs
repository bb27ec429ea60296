use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::RemoteConfig;

/// HTTP client for the content service
#[derive(Clone)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Authentication failed")]
    Unauthorized,
    #[error("Access denied")]
    Forbidden,
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Too many requests")]
    RateLimited,
    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },
    #[error("Request rejected ({code}): {message}")]
    Api { code: i64, message: String },
    #[error("Response carried no data")]
    EmptyResponse,
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl RemoteError {
    /// Failures that may succeed when retried unchanged
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::RateLimited => true,
            Self::Server { status, .. } => *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Http(e)
    }
}

/// Uniform response wrapper used by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

/// Pull a human readable message out of an error body
fn describe_body(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = json.get("message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
        if let Some(error) = json.get("error").and_then(|v| v.as_str()) {
            return error.to_string();
        }
    }
    body.trim().to_string()
}

impl RemoteClient {
    /// Create a new client from connection settings
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        Self::with_timeouts(
            &config.api_base_url,
            config.token.clone(),
            config.request_timeout(),
            config.connect_timeout(),
        )
    }

    pub fn with_timeouts(
        base_url: &str,
        token: Option<String>,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, RemoteError> {
        // Normalize URL - ensure no trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(RemoteError::InvalidUrl(
                "URL must start with http:// or https://".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build full URL for a path
    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, self.url(path))
            .header("X-Request-ID", Uuid::new_v4().to_string());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<Option<T>, RemoteError> {
        let response = request.send().await.map_err(transport_error)?;
        Self::read_envelope(response, path).await
    }

    async fn read_envelope<T: DeserializeOwned>(
        response: Response,
        path: &str,
    ) -> Result<Option<T>, RemoteError> {
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                return Err(RemoteError::BadRequest(describe_body(&body)));
            }
            StatusCode::UNAUTHORIZED => return Err(RemoteError::Unauthorized),
            StatusCode::FORBIDDEN => return Err(RemoteError::Forbidden),
            StatusCode::NOT_FOUND => return Err(RemoteError::NotFound(path.to_string())),
            StatusCode::TOO_MANY_REQUESTS => return Err(RemoteError::RateLimited),
            status if !status.is_success() => {
                return Err(RemoteError::Server {
                    status: status.as_u16(),
                    message: describe_body(&body),
                });
            }
            _ => {}
        }

        if body.trim().is_empty() {
            return Ok(None);
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        if envelope.code != 200 && envelope.code != 201 {
            return Err(RemoteError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }
        Ok(envelope.data)
    }

    fn require<T>(data: Option<T>) -> Result<T, RemoteError> {
        data.ok_or(RemoteError::EmptyResponse)
    }

    /// GET returning the envelope's data
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let data = self.execute(self.request(Method::GET, path), path).await?;
        Self::require(data)
    }

    /// GET with query parameters
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.request(Method::GET, path).query(query);
        let data = self.execute(request, path).await?;
        Self::require(data)
    }

    /// Send a JSON body and decode the returned entity
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(method, path).json(body);
        let data = self.execute(request, path).await?;
        Self::require(data)
    }

    /// Send a JSON body when no entity comes back
    pub async fn send_json_unit<B>(&self, method: Method, path: &str, body: &B) -> Result<(), RemoteError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.request(method, path).json(body);
        self.execute::<serde::de::IgnoredAny>(request, path).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        self.execute::<serde::de::IgnoredAny>(self.request(Method::DELETE, path), path)
            .await?;
        Ok(())
    }
}
