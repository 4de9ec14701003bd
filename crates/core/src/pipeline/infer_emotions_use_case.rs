use std::sync::Arc;
use std::time::Instant;

use crate::classification::domain::emotion::PredictionResult;
use crate::classification::domain::emotion_classifier::{dominant_emotion, EmotionClassifier};
use crate::classification::domain::patch_normalizer::normalize_patch;
use crate::decoding::image_decoder::{decode_grayscale, DecodeError};
use crate::detection::domain::face_detector::{DetectionParams, FaceDetector};
use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::image_buffer::ImageBuffer;
use crate::shared::region::FaceRegion;

/// Successful outcome of one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inference {
    NoFaces,
    /// Non-empty, in detection order.
    Faces(Vec<PredictionResult>),
}

/// Single-image emotion pipeline: decode → detect → normalize → classify.
///
/// Holds only shared, read-only collaborators, so one instance serves all
/// concurrent requests.
pub struct InferEmotionsUseCase {
    detector: Arc<dyn FaceDetector>,
    classifier: Arc<dyn EmotionClassifier>,
    params: DetectionParams,
}

impl InferEmotionsUseCase {
    pub fn new(
        detector: Arc<dyn FaceDetector>,
        classifier: Arc<dyn EmotionClassifier>,
        params: DetectionParams,
    ) -> Self {
        Self {
            detector,
            classifier,
            params,
        }
    }

    pub fn infer(&self, buffer: &ImageBuffer) -> Result<Inference, PipelineError> {
        let started = Instant::now();
        let raster = decode_grayscale(buffer)?;
        if raster.is_degenerate() {
            return Err(DecodeError::ZeroArea {
                width: raster.width(),
                height: raster.height(),
            }
            .into());
        }
        log::debug!(
            "decode: {}x{} in {:.1}ms",
            raster.width(),
            raster.height(),
            elapsed_ms(started)
        );

        let started = Instant::now();
        let regions: Vec<FaceRegion> = self
            .detector
            .detect(&raster, &self.params)?
            .into_iter()
            .filter_map(|r| r.clamp_to(raster.width(), raster.height()))
            .collect();
        log::debug!("detect: {} faces in {:.1}ms", regions.len(), elapsed_ms(started));

        if regions.is_empty() {
            return Ok(Inference::NoFaces);
        }

        let started = Instant::now();
        let mut results = Vec::with_capacity(regions.len());
        for region in regions {
            let patch = normalize_patch(&raster, &region)?;
            let probabilities = self.classifier.predict(patch.view())?;
            let label = dominant_emotion(&probabilities)?;
            results.push(PredictionResult { label, region });
        }
        log::debug!("classify: {} faces in {:.1}ms", results.len(), elapsed_ms(started));

        Ok(Inference::Faces(results))
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
