use crate::config::BackendConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Body posted to the reply backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub email_content: String,
    pub tone: String,
}

/// Why a reply could not be generated; the display text is shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("Unable to connect to the server. Please ensure the backend is running.")]
    Unreachable,

    #[error("Invalid request. Please check your input.")]
    InvalidRequest,

    #[error("Server error occurred. Please try again later.")]
    ServerFault,

    #[error("Network error: {0}")]
    Network(String),

    #[error("{}", unclassified_message(.status, .message))]
    Unclassified { status: Option<u16>, message: Option<String> },
}

fn unclassified_message(status: &Option<u16>, message: &Option<String>) -> String {
    match (*status, message.as_deref()) {
        (Some(status), Some(message)) if !message.is_empty() => format!("Error {}: {}", status, message),
        (Some(status), _) => format!("Error {}: Unknown error occurred", status),
        (None, Some(message)) if !message.is_empty() => message.to_string(),
        (None, _) => "An unknown error occurred".to_string(),
    }
}

impl GenerateError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            0 => GenerateError::Unreachable,
            400 => GenerateError::InvalidRequest,
            500 => GenerateError::ServerFault,
            _ => GenerateError::Unclassified {
                status: Some(status),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for GenerateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            GenerateError::Unreachable
        } else if let Some(status) = e.status() {
            GenerateError::from_status(status.as_u16(), Some(e.to_string()))
        } else {
            GenerateError::Network(e.to_string())
        }
    }
}

/// Turns email text and a tone into a reply
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, request: &ReplyRequest) -> Result<String, GenerateError>;
}

/// Reply generator backed by the HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpReplyGenerator {
    endpoint: url::Url,
    http: reqwest::Client,
}

impl HttpReplyGenerator {
    pub fn new(config: &BackendConfig) -> Result<Self, GenerateError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerateError::Network(e.to_string()))?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            http,
        })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }
}

#[async_trait]
impl ReplyGenerator for HttpReplyGenerator {
    async fn generate(&self, request: &ReplyRequest) -> Result<String, GenerateError> {
        log::debug!("Requesting {} reply from {}", request.tone, self.endpoint);
        let response = self.http.post(self.endpoint.clone()).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().map(str::to_string);
            return Err(GenerateError::from_status(status.as_u16(), reason));
        }

        Ok(response.text().await?)
    }
}
