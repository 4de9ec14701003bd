/// A decoded single-channel image: 8-bit intensity samples in row-major order.
///
/// Owned by the inference pipeline for the duration of one request.
#[derive(Clone, Debug)]
pub struct Raster {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Raster {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "data length must equal width * height"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Sample at column `x`, row `y`. Panics when out of bounds.
    pub fn sample(&self, x: u32, y: u32) -> u8 {
        self.data[(y as usize) * (self.width as usize) + x as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![7u8; 6]; // 3x2
        let raster = Raster::new(data.clone(), 3, 2);
        assert_eq!(raster.width(), 3);
        assert_eq!(raster.height(), 2);
        assert_eq!(raster.data(), &data[..]);
        assert!(!raster.is_degenerate());
    }

    #[test]
    fn test_zero_dimension_is_degenerate() {
        assert!(Raster::new(Vec::new(), 0, 10).is_degenerate());
        assert!(Raster::new(Vec::new(), 10, 0).is_degenerate());
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height")]
    fn test_mismatched_data_length_panics_in_debug() {
        Raster::new(vec![0u8; 5], 2, 2);
    }

    #[test]
    fn test_sample_is_row_major() {
        // row 0: 0 1 2, row 1: 3 4 5
        let raster = Raster::new((0..6).collect(), 3, 2);
        assert_eq!(raster.sample(0, 0), 0);
        assert_eq!(raster.sample(2, 0), 2);
        assert_eq!(raster.sample(0, 1), 3);
        assert_eq!(raster.sample(2, 1), 5);
    }
}
