use thiserror::Error;

use crate::shared::constants::{DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR};
use crate::shared::raster::Raster;
use crate::shared::region::FaceRegion;

/// Fixed detection parameters, taken from configuration rather than derived
/// from the image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionParams {
    /// Ratio between successive window sizes of the search pyramid (> 1).
    pub scale_factor: f64,
    /// Raw candidates a face needs before it is reported.
    pub min_neighbors: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
        }
    }
}

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("failed to load face detector model: {0}")]
    ModelLoad(String),
    #[error("invalid detection parameters: {0}")]
    InvalidParams(String),
    #[error("face detector inference failed: {0}")]
    Inference(String),
}

/// Domain interface for face detection.
///
/// Implementations are shared across concurrent requests, hence `&self`
/// and `Sync`. Returned regions must lie inside the raster.
pub trait FaceDetector: Send + Sync {
    fn detect(
        &self,
        raster: &Raster,
        params: &DetectionParams,
    ) -> Result<Vec<FaceRegion>, DetectionError>;
}

impl DetectionParams {
    pub fn validate(&self) -> Result<(), DetectionError> {
        if !(self.scale_factor > 1.0 && self.scale_factor.is_finite()) {
            return Err(DetectionError::InvalidParams(format!(
                "scale factor must be greater than 1, got {}",
                self.scale_factor
            )));
        }
        Ok(())
    }
}
