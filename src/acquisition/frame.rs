// src/acquisition/frame.rs
//! Frame buffer capability over row-major RGBA bytes

use crate::error::{ScreeningError, ScreeningResult};

/// Read-only access to a decoded video frame or still image
pub trait FrameBuffer: Send + Sync {
    /// Width in pixels
    fn width(&self) -> usize;

    /// Height in pixels
    fn height(&self) -> usize;

    /// Row-major RGBA bytes, `width * height * 4` long
    fn rgba(&self) -> &[u8];

    /// RGBA value at `(x, y)`, `None` outside the frame
    fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let offset = (y * self.width() + x) * 4;
        self.rgba()
            .get(offset..offset + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Rec. 601 luma at `(x, y)`, `0.0` outside the frame
    fn luma(&self, x: usize, y: usize) -> f64 {
        self.pixel(x, y)
            .map(|[r, g, b, _]| 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b))
            .unwrap_or(0.0)
    }
}

/// Owned RGBA frame
#[derive(Debug, Clone, PartialEq)]
pub struct RgbaFrame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl RgbaFrame {
    /// Wrap RGBA bytes; the length must equal `width * height * 4`
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> ScreeningResult<Self> {
        let expected = width * height * 4;
        if data.len() != expected {
            return Err(ScreeningError::InvalidFrame {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// Frame filled with a single opaque colour
    pub fn solid(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let data = std::iter::repeat([rgb[0], rgb[1], rgb[2], 255])
            .take(width * height)
            .flatten()
            .collect();
        Self { width, height, data }
    }

    /// Overwrite one pixel; out-of-bounds writes are ignored
    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y * self.width + x) * 4;
        self.data[offset..offset + 3].copy_from_slice(&rgb);
        self.data[offset + 3] = 255;
    }

    /// Fill the rectangle `[x, x + w) x [y, y + h)`, clipped to the frame
    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, rgb: [u8; 3]) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.set_pixel(col, row, rgb);
            }
        }
    }
}

impl FrameBuffer for RgbaFrame {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn rgba(&self) -> &[u8] {
        &self.data
    }
}
