use std::io::Cursor;

use image::{DynamicImage, ImageFormat, ImageReader};
use thiserror::Error;

use crate::shared::image_buffer::ImageBuffer;
use crate::shared::raster::Raster;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("image payload is empty")]
    Empty,
    #[error("unrecognised image encoding: {0}")]
    Unrecognised(String),
    #[error("image has zero area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },
}

/// Decode an uploaded payload into a grayscale [`Raster`].
///
/// The declared content type is tried first as a format hint; when it is
/// absent, unknown, or wrong the format is sniffed from the bytes.
pub fn decode_grayscale(buffer: &ImageBuffer) -> Result<Raster, DecodeError> {
    if buffer.is_empty() {
        return Err(DecodeError::Empty);
    }

    let image = match decode_with_hint(buffer) {
        Some(image) => image,
        None => decode_guessed(buffer.bytes())?,
    };

    let gray = image.into_luma8();
    let (width, height) = gray.dimensions();
    let raster = Raster::new(gray.into_raw(), width, height);
    if raster.is_degenerate() {
        return Err(DecodeError::ZeroArea { width, height });
    }
    Ok(raster)
}

fn decode_with_hint(buffer: &ImageBuffer) -> Option<DynamicImage> {
    let format = buffer.content_type().and_then(ImageFormat::from_mime_type)?;
    match image::load_from_memory_with_format(buffer.bytes(), format) {
        Ok(image) => Some(image),
        Err(e) => {
            log::debug!("Declared format {format:?} did not decode ({e}), sniffing instead");
            None
        }
    }
}

fn decode_guessed(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::Unrecognised(e.to_string()))?
        .decode()
        .map_err(|e| DecodeError::Unrecognised(e.to_string()))
}
