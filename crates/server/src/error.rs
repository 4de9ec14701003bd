use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use facemood_core::pipeline::pipeline_error::PipelineError;
use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the `/predict` endpoint.
///
/// Bodies are fixed strings except for `Decode`, which echoes the decoder's
/// description of the uploaded data. Store and model internals never reach
/// the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    /// No readable `image` field. A body over the configured limit fails
    /// while the field is read and lands here too.
    #[error("no file uploaded")]
    MissingInput,

    #[error("failed to process the image: {0}")]
    Decode(String),

    #[error("emotion inference failed")]
    PipelineFault,
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MissingInput | Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::PipelineFault => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        if e.is_client_error() {
            log::info!("Rejected upload: {e}");
            Self::Decode(e.to_string())
        } else {
            log::error!("Inference failed: {e}");
            Self::PipelineFault
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::Unauthorized => json!({ "error": "Unauthorized" }),
            Self::MissingInput => json!({ "error": "No file uploaded" }),
            Self::Decode(message) => json!({
                "error": "Failed to process the image",
                "message": message,
            }),
            Self::PipelineFault => json!({
                "error": "Failed to run emotion inference",
                "message": "Internal inference error",
            }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facemood_core::classification::domain::emotion_classifier::ClassifierError;
    use facemood_core::decoding::image_decoder::DecodeError;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::MissingInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Decode("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::PipelineFault.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_decode_failure_is_client_error() {
        let err: ApiError = PipelineError::from(DecodeError::Empty).into();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_classifier_failure_hides_detail() {
        let err: ApiError =
            PipelineError::from(ClassifierError::Inference("session exploded".into())).into();
        assert!(matches!(err, ApiError::PipelineFault));
        assert!(!err.to_string().contains("exploded"));
    }
}
