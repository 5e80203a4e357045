use crate::errors::AIError;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::stream::{GenerateRequest, GenerateResponse};

#[derive(Deserialize, Debug)]
struct VersionResponse {
    version: String,
}

/// Version endpoint on the same server as a generate URL.
///
/// `http://localhost:11434/api/generate` becomes `http://localhost:11434/api/version`;
/// a bare origin gets `/api/version` appended.
pub fn version_url(api_url: &str) -> String {
    let trimmed = api_url.trim().trim_end_matches('/');
    match trimmed.find("/api/") {
        Some(idx) => format!("{}/api/version", &trimmed[..idx]),
        None => format!("{}/api/version", trimmed),
    }
}

/// Thin wrapper over `reqwest::Client` for one Ollama endpoint and model.
///
/// Connect and total timeouts are fixed at construction and apply to every
/// request the client makes, streaming or not.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    api_url: String,
    model: String,
}

impl OllamaClient {
    pub fn with_timeouts(
        api_url: &str,
        model: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, AIError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(AIError::Request)?;

        Ok(OllamaClient {
            client,
            api_url: api_url.trim().to_string(),
            model: model.trim().to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One request with streaming disabled; returns the complete `response` text.
    pub async fn generate_blocking(&self, prompt: &str) -> Result<String, AIError> {
        let response = self.post_generate(prompt, false).await?;
        let body = response.text().await.map_err(|e| self.classify(e))?;

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Ollama returned an unexpected body: {}", e);
            AIError::MalformedResponse(format!(
                "expected a JSON object with a 'response' field: {e}"
            ))
        })?;
        tracing::debug!(
            "Received {} characters from {}",
            parsed.response.chars().count(),
            self.api_url
        );
        Ok(parsed.response)
    }

    /// Starts a streaming request. The caller consumes the NDJSON body.
    pub async fn open_stream(&self, prompt: &str) -> Result<Response, AIError> {
        self.post_generate(prompt, true).await
    }

    /// `GET /api/version` on the server behind the generate URL.
    pub async fn server_version(&self) -> Result<String, AIError> {
        let url = version_url(&self.api_url);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(AIError::OtherHttpError { status, body });
        }

        let version: VersionResponse = response
            .json()
            .await
            .map_err(|e| AIError::MalformedResponse(format!("invalid version response: {e}")))?;
        Ok(version.version)
    }

    async fn post_generate(&self, prompt: &str, stream: bool) -> Result<Response, AIError> {
        let payload = GenerateRequest {
            model: &self.model,
            prompt,
            stream,
        };
        tracing::debug!(
            "POST {} (model: {}, stream: {}, prompt: {} chars)",
            self.api_url,
            self.model,
            stream,
            prompt.chars().count()
        );

        let response = self
            .client
            .post(&self.api_url)
            .header(header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        self.check_status(response).await
    }

    async fn check_status(&self, response: Response) -> Result<Response, AIError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(AIError::ModelNotFound {
                model: self.model.clone(),
            }),
            status => {
                let body = read_error_body(response).await;
                tracing::error!("Ollama request failed with status {}: {}", status, body);
                Err(AIError::OtherHttpError { status, body })
            }
        }
    }

    /// Maps a transport error onto the failure taxonomy.
    pub fn classify(&self, err: reqwest::Error) -> AIError {
        if err.is_timeout() {
            AIError::Timeout {
                url: self.api_url.clone(),
            }
        } else if err.is_connect() {
            AIError::ConnectionRefused {
                url: self.api_url.clone(),
            }
        } else {
            AIError::Request(err)
        }
    }
}

async fn read_error_body(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body from Ollama response".to_string())
}
