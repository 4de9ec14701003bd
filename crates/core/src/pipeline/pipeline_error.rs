use thiserror::Error;

use crate::classification::domain::emotion_classifier::ClassifierError;
use crate::decoding::image_decoder::DecodeError;
use crate::detection::domain::face_detector::DetectionError;

/// Terminal failure of one inference request. Nothing is retried.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

impl PipelineError {
    /// True when the failure was caused by the uploaded bytes, not the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
