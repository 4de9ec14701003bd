use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use ndarray::Array4;

use super::emotion_classifier::ClassifierError;
use crate::shared::constants::PATCH_SIZE;
use crate::shared::raster::Raster;
use crate::shared::region::FaceRegion;

/// Crop a face out of the raster and shape it for the classifier.
///
/// The crop is resized to `PATCH_SIZE × PATCH_SIZE` with bilinear filtering,
/// divided by 255, and laid out as a single-sample NHWC batch `[1, 48, 48, 1]`.
pub fn normalize_patch(raster: &Raster, region: &FaceRegion) -> Result<Array4<f32>, ClassifierError> {
    if !region.fits_within(raster.width(), raster.height()) {
        return Err(ClassifierError::MalformedInput(format!(
            "region {:?} outside {}x{} raster",
            region.to_box(),
            raster.width(),
            raster.height()
        )));
    }

    let crop = GrayImage::from_fn(region.width, region.height, |x, y| {
        Luma([raster.sample(region.x + x, region.y + y)])
    });
    let resized = imageops::resize(&crop, PATCH_SIZE, PATCH_SIZE, FilterType::Triangle);

    let side = PATCH_SIZE as usize;
    let mut patch = Array4::<f32>::zeros((1, side, side, 1));
    for (x, y, pixel) in resized.enumerate_pixels() {
        patch[[0, y as usize, x as usize, 0]] = pixel.0[0] as f32 / 255.0;
    }
    Ok(patch)
}
