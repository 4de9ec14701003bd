/// Axis-aligned face rectangle in raster coordinates.
///
/// A valid region has non-zero size and lies fully inside the raster it was
/// detected in. Use [`FaceRegion::clamp_to`] to enforce that on detector output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a region from floating-point corners, clamped to a `width × height` raster.
    ///
    /// Returns `None` when nothing of the box remains inside the raster.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64, width: u32, height: u32) -> Option<Self> {
        let left = x1.max(0.0).round() as i64;
        let top = y1.max(0.0).round() as i64;
        let right = x2.min(width as f64).round() as i64;
        let bottom = y2.min(height as f64).round() as i64;
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    /// Intersect this region with a `width × height` raster.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        let right = self.x.saturating_add(self.width).min(width);
        let bottom = self.y.saturating_add(self.height).min(height);
        if self.x >= right || self.y >= bottom {
            return None;
        }
        Some(Self {
            x: self.x,
            y: self.y,
            width: right - self.x,
            height: bottom - self.y,
        })
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= height)
    }

    /// `[x, y, width, height]`, the wire layout of a prediction box.
    pub fn to_box(&self) -> [u32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}
