use log::{debug, info};
use reqwest::multipart;
use serde::Deserialize;

/// Client for the remote speech-transcription endpoint.
pub struct TranscriptionClient {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("transcription service returned {status}: {detail}")]
    Api { status: u16, detail: String },
    #[error("invalid transcription response: {0}")]
    InvalidResponse(String),
}

/// Success body of the transcriptions endpoint. A missing `text` field is
/// treated as an empty transcript, not an error.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl TranscriptionClient {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_url,
            model,
        }
    }

    /// Uploads the audio as a multipart form and returns the transcript text.
    /// One shot, no retries, no explicit timeout.
    pub async fn transcribe(
        &self,
        audio_bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, TranscribeError> {
        let file_part = multipart::Part::bytes(audio_bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| TranscribeError::Request(format!("mime: {e}")))?;

        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", file_part);

        debug!("Sending audio '{}' to {}", filename, self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscribeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Api {
                status: status.as_u16(),
                detail: upstream_detail(&body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TranscribeError::InvalidResponse(e.to_string()))?;
        let transcription: TranscriptionResponse = serde_json::from_str(&body)
            .map_err(|e| TranscribeError::InvalidResponse(e.to_string()))?;

        info!(
            "Transcription completed: {} characters",
            transcription.text.len()
        );

        Ok(transcription.text)
    }
}

/// Prefers the remote service's structured error body, falling back to the
/// raw response text.
fn upstream_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => json.to_string(),
        Err(_) if body.trim().is_empty() => "could not retrieve detailed error from API".to_string(),
        Err(_) => body.to_string(),
    }
}
