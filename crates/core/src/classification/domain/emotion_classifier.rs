use ndarray::ArrayView4;
use thiserror::Error;

use super::emotion::EmotionLabel;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("failed to load emotion model: {0}")]
    ModelLoad(String),
    #[error("malformed classifier input: {0}")]
    MalformedInput(String),
    #[error("emotion inference failed: {0}")]
    Inference(String),
    #[error("unexpected classifier output: {0}")]
    InvalidOutput(String),
}

/// Domain interface for emotion classification.
///
/// Takes a `[1, 48, 48, 1]` batch of intensities in `[0, 1]` and returns one
/// probability per [`EmotionLabel`], in label index order.
pub trait EmotionClassifier: Send + Sync {
    fn predict(&self, patch: ArrayView4<'_, f32>) -> Result<Vec<f32>, ClassifierError>;
}

/// Arg-max over a probability vector. The first maximum wins on ties.
pub fn dominant_emotion(probabilities: &[f32]) -> Result<EmotionLabel, ClassifierError> {
    if probabilities.len() != EmotionLabel::ALL.len() {
        return Err(ClassifierError::InvalidOutput(format!(
            "expected {} probabilities, got {}",
            EmotionLabel::ALL.len(),
            probabilities.len()
        )));
    }
    if probabilities.iter().any(|p| p.is_nan()) {
        return Err(ClassifierError::InvalidOutput(
            "probability vector contains NaN".into(),
        ));
    }

    let mut best = 0;
    for (i, &p) in probabilities.iter().enumerate().skip(1) {
        if p > probabilities[best] {
            best = i;
        }
    }
    EmotionLabel::from_index(best)
        .ok_or_else(|| ClassifierError::InvalidOutput(format!("no label for index {best}")))
}
