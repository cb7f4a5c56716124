use std::error::Error as _;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::{ClientConfig, ConfigError};
use crate::status::{HealthResponse, FALLBACK_ERROR};

const TUNNEL_WARNING_HEADER: &str = "ngrok-skip-browser-warning";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Network unreachable, DNS, refused connections, transport timeouts.
    #[error("{0}")]
    Transport(String),
    #[error("HTTP error! status: {status}")]
    Status { status: u16 },
    #[error("invalid response body: {0}")]
    Parse(String),
    #[error("{}", or_fallback(.0))]
    Unknown(String),
}

fn or_fallback(message: &str) -> &str {
    if message.trim().is_empty() {
        FALLBACK_ERROR
    } else {
        message
    }
}

#[async_trait]
pub trait RemoteServiceClient: Send + Sync {
    async fn health_check(&self) -> Result<HealthResponse, ClientError>;
}

#[async_trait]
impl<C: RemoteServiceClient + ?Sized> RemoteServiceClient for Arc<C> {
    async fn health_check(&self) -> Result<HealthResponse, ClientError> {
        (**self).health_check().await
    }
}

pub struct HttpServiceClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpServiceClient {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        reqwest::Url::parse(&config.base_url).map_err(|err| ConfigError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: err.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(TUNNEL_WARNING_HEADER),
            HeaderValue::from_static("true"),
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| ConfigError::Client(err.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GETs `path` relative to the base url and decodes a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.config.endpoint(path);
        debug!(%url, "sending request");

        let mut response = self.http.get(&url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
            });
        }

        let limit = self.config.max_body_bytes;
        let too_large = || ClientError::Parse(format!("body exceeds {limit} bytes"));
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(too_large());
        }

        // Chunked bodies carry no length; stop reading once past the cap.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        serde_json::from_slice(&body).map_err(|err| ClientError::Parse(err.to_string()))
    }
}

#[async_trait]
impl RemoteServiceClient for HttpServiceClient {
    async fn health_check(&self) -> Result<HealthResponse, ClientError> {
        self.get_json(&self.config.health_path).await
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_decode() {
        return ClientError::Parse(err.to_string());
    }
    if err.is_builder() {
        return ClientError::Unknown(err.to_string());
    }
    ClientError::Transport(transport_message(&err))
}

// reqwest's top-level message only names the url; the cause is in the chain.
fn transport_message(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
