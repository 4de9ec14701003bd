/// Emotion classifier using ONNX Runtime via `ort`.
///
/// Accepts the normalizer's NHWC patch and transposes it when the model was
/// exported channel-first.
use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array4, ArrayView4};

use crate::classification::domain::emotion_classifier::{ClassifierError, EmotionClassifier};
use crate::shared::constants::PATCH_SIZE;
use crate::shared::onnx_session::build_session;

/// Memory layout of the model's image input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputLayout {
    /// `[N, H, W, C]`, the Keras default.
    ChannelsLast,
    /// `[N, C, H, W]`.
    ChannelsFirst,
}

pub struct OnnxEmotionClassifier {
    session: Mutex<ort::session::Session>,
    layout: InputLayout,
}

impl OnnxEmotionClassifier {
    /// Load the emotion model. Fails if the file is missing or not a valid model.
    pub fn new(model_path: &Path) -> Result<Self, ClassifierError> {
        let session = build_session(model_path).map_err(ClassifierError::ModelLoad)?;

        let layout = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    Some(layout_from_shape(shape))
                } else {
                    None
                }
            })
            .unwrap_or(InputLayout::ChannelsLast);
        log::debug!("Emotion model input layout: {layout:?}");

        Ok(Self {
            session: Mutex::new(session),
            layout,
        })
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn predict(&self, patch: ArrayView4<'_, f32>) -> Result<Vec<f32>, ClassifierError> {
        let side = PATCH_SIZE as usize;
        if patch.shape() != [1, side, side, 1] {
            return Err(ClassifierError::MalformedInput(format!(
                "expected patch shape [1, {side}, {side}, 1], got {:?}",
                patch.shape()
            )));
        }

        let input: Array4<f32> = match self.layout {
            InputLayout::ChannelsLast => patch.to_owned(),
            InputLayout::ChannelsFirst => patch
                .permuted_axes([0, 3, 1, 2])
                .as_standard_layout()
                .into_owned(),
        };
        let input_value = ort::value::Tensor::from_array(input)
            .map_err(|e| ClassifierError::MalformedInput(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::Inference("classifier session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(ClassifierError::InvalidOutput(
                "emotion model produced no outputs".into(),
            ));
        }

        let probabilities = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| ClassifierError::InvalidOutput(e.to_string()))?;
        Ok(probabilities.iter().copied().collect())
    }
}

/// Channel-first when the axis after the batch is a single channel and the
/// last axis is not.
fn layout_from_shape(shape: &[i64]) -> InputLayout {
    if shape.len() == 4 && shape[1] == 1 && shape[3] != 1 {
        InputLayout::ChannelsFirst
    } else {
        InputLayout::ChannelsLast
    }
}
