use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Upper bound on the whole correction round trip. The pipeline falls back to
/// the raw transcript when it elapses.
const CORRECTION_TIMEOUT: Duration = Duration::from_secs(120);

const TEMPERATURE: f32 = 0.3;
const TOP_P: f32 = 0.7;

/// Outcome of a correction attempt. `applied` is true only when the remote
/// call succeeded and `text` holds its output; on failure `text` is the
/// original transcript unchanged.
#[derive(Debug)]
pub struct Correction {
    pub text: String,
    pub applied: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CorrectError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("chat service returned {status}: {detail}")]
    Api { status: u16, detail: String },
    #[error("invalid chat response: {0}")]
    InvalidResponse(String),
}

/// Client for the chat-completion endpoint used to clean up transcripts.
pub struct CorrectionClient {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl CorrectionClient {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_url,
            model,
        }
    }

    /// Asks the LLM to clean up the transcript. Never fails the request: any
    /// error degrades to the original text with `applied = false`.
    pub async fn correct(&self, text: &str) -> Correction {
        match self.request_correction(text).await {
            Ok(corrected) => {
                info!("Correction applied: {} characters", corrected.len());
                Correction {
                    text: corrected,
                    applied: true,
                }
            }
            Err(e) => {
                warn!("Correction failed, returning original text: {e}");
                Correction {
                    text: text.to_string(),
                    applied: false,
                }
            }
        }
    }

    async fn request_correction(&self, text: &str) -> Result<String, CorrectError> {
        let request_body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: correction_prompt(text),
            }],
            temperature: TEMPERATURE,
            top_p: TOP_P,
        };

        debug!("Sending correction request to {}", self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .timeout(CORRECTION_TIMEOUT)
            .send()
            .await
            .map_err(|e| CorrectError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CorrectError::Api {
                status: status.as_u16(),
                detail: body,
            });
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CorrectError::InvalidResponse(e.to_string()))?;

        extract_corrected_text(body)
    }
}

fn correction_prompt(text: &str) -> String {
    format!(
        "Fix the typos, grammatical errors and awkward phrasing in the following \
         transcribed recording. You may make moderate edits and additions based on \
         the content. Remove filler words. Return only the corrected plain text, \
         with no extra explanation or markdown formatting:\n\n{text}"
    )
}

fn extract_corrected_text(response: ChatCompletionResponse) -> Result<String, CorrectError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .ok_or_else(|| CorrectError::InvalidResponse("no completion choices".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_the_transcript() {
        let prompt = correction_prompt("uh so basically hello");
        assert!(prompt.ends_with("\n\nuh so basically hello"));
        assert!(prompt.contains("Remove filler words"));
    }

    #[test]
    fn corrected_text_comes_from_first_choice_trimmed() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [
                {"message": {"role": "assistant", "content": "  Hello, world.  "}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(extract_corrected_text(response).unwrap(), "Hello, world.");
    }

    #[test]
    fn empty_choices_is_an_invalid_response() {
        let response: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = extract_corrected_text(response).unwrap_err();
        assert!(matches!(err, CorrectError::InvalidResponse(_)));
    }

    #[actix_web::test]
    async fn failed_call_falls_back_to_original_text() {
        // Port 9 (discard) is unroutable as an HTTP endpoint, so the request
        // errors immediately and the fallback path must engage.
        let client = CorrectionClient::new(
            "test-key".to_string(),
            "http://127.0.0.1:9/v1/chat/completions".to_string(),
            "test-model".to_string(),
        );
        let correction = client.correct("hello world").await;
        assert_eq!(correction.text, "hello world");
        assert!(!correction.applied);
    }
}
