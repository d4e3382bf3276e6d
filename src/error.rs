use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::audio::NormalizeError;
use crate::dto::ErrorBody;
use crate::transcription::TranscribeError;

/// Everything the transcribe endpoint can fail with. Client-input problems map
/// to 400, upstream and unclassified failures to 500; every response body is
/// `{"detail": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("Failed to convert audio file: {0}")]
    AudioConversion(String),
    #[error("Error calling transcription API: {0}")]
    Transcription(String),
    #[error("An error occurred: {0}")]
    Internal(String),
}

impl From<NormalizeError> for ApiError {
    fn from(e: NormalizeError) -> Self {
        ApiError::AudioConversion(e.to_string())
    }
}

impl From<TranscribeError> for ApiError {
    fn from(e: TranscribeError) -> Self {
        ApiError::Transcription(e.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::AudioConversion(_) => StatusCode::BAD_REQUEST,
            ApiError::Transcription(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            detail: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_input_errors_are_bad_requests() {
        assert_eq!(ApiError::MissingFile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::AudioConversion("bad data".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn upstream_and_unclassified_errors_are_server_errors() {
        assert_eq!(
            ApiError::Transcription("502".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn conversion_failure_keeps_the_decoder_message() {
        let err: ApiError = NormalizeError::Probe("unsupported format".to_string()).into();
        assert!(err.to_string().contains("unsupported format"));
        assert!(err.to_string().starts_with("Failed to convert audio file"));
    }
}
