//! Client for the external video-generation service.
//!
//! The service exposes `POST /api/generate-video` and a liveness probe at
//! `GET /`. Generated files are served from `/uploads/{filename}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Request could not be sent, or no response arrived before the timeout.
    #[error("video backend unreachable: {0}")]
    Network(String),
    /// The backend answered with a non-success status.
    #[error("video generation failed: {status} {body}")]
    Service { status: u16, body: String },
    /// Success status but no usable video path in the body.
    #[error("malformed response from video backend: {0}")]
    MalformedResponse(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub topic: String,
    pub course_title: String,
    pub course_description: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BackendStatus {
    pub is_running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// Issues one generation request and returns the decoded JSON body.
    async fn generate(&self, req: &VideoRequest) -> Result<Value, GenerationError>;
    async fn probe(&self) -> BackendStatus;
}

pub struct HttpVideoBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVideoBackend {
    /// `timeout` bounds every request made by this client.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn network(e: reqwest::Error) -> GenerationError {
    GenerationError::Network(e.to_string())
}

#[async_trait]
impl VideoBackend for HttpVideoBackend {
    async fn generate(&self, req: &VideoRequest) -> Result<Value, GenerationError> {
        let url = self.endpoint("/api/generate-video");
        tracing::debug!(%url, topic = %req.topic, "requesting video");

        let res = self.client.post(&url).json(req).send().await.map_err(network)?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GenerationError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let body = res.bytes().await.map_err(network)?;
        serde_json::from_slice(&body).map_err(|e| GenerationError::MalformedResponse(e.to_string()))
    }

    async fn probe(&self) -> BackendStatus {
        match self.client.get(self.endpoint("/")).send().await {
            Ok(res) => BackendStatus {
                is_running: res.status().is_success(),
                status: Some(res.status().as_u16()),
                error: None,
            },
            Err(e) => BackendStatus {
                is_running: false,
                status: None,
                error: Some(e.to_string()),
            },
        }
    }
}
