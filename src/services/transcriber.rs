// SPDX-License-Identifier: MIT

//! HTTP client for the external AI transcription service.

use crate::error::AppError;
use serde::Deserialize;

/// Transcription service client.
#[derive(Clone)]
pub struct TranscriberClient {
    http: reqwest::Client,
    base_url: String,
}

/// Response from the transcription endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptResponse {
    pub transcript: String,
}

impl TranscriberClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Transcribe a previously uploaded audio file by its external id.
    pub async fn transcribe(&self, file_id: &str) -> Result<TranscriptResponse, AppError> {
        let url = format!("{}/api/transcribe/{}", self.base_url, file_id);

        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Transcription request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("JSON parse error: {}", e)))
    }
}
