// src/acquisition/roi.rs
//! Facial regions of interest and mean-colour extraction

use super::frame::FrameBuffer;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Roi {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Integer pixel bounds `(x0, y0, x1, y1)` clipped to a `width x height` frame
    ///
    /// Coordinates are floored first. Returns `None` when nothing of the
    /// rectangle lies inside the frame.
    pub fn pixel_bounds(&self, width: usize, height: usize) -> Option<(usize, usize, usize, usize)> {
        let clip = |v: f64, max: usize| v.floor().clamp(0.0, max as f64) as usize;
        let x0 = clip(self.x, width);
        let y0 = clip(self.y, height);
        let x1 = clip(self.x.floor() + self.width.floor(), width);
        let y1 = clip(self.y.floor() + self.height.floor(), height);

        (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
    }
}

/// Mean colour of a region, channel values on the 0-255 scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RgbColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

/// A 2-D landmark point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Face-landmark collaborator
///
/// Landmark detection is external; implementors return zero or more regions for
/// a frame, primary (forehead) region first.
pub trait RoiProvider: Send + Sync {
    /// Regions for this frame; empty when no face was found
    fn select_regions(&self, frame: &dyn FrameBuffer) -> Vec<Roi>;
}

impl<F> RoiProvider for F
where
    F: Fn(&dyn FrameBuffer) -> Vec<Roi> + Send + Sync,
{
    fn select_regions(&self, frame: &dyn FrameBuffer) -> Vec<Roi> {
        self(frame)
    }
}

/// Provider returning the same regions for every frame
#[derive(Debug, Clone, Default)]
pub struct FixedRoiProvider {
    regions: Vec<Roi>,
}

impl FixedRoiProvider {
    pub fn new(regions: Vec<Roi>) -> Self {
        Self { regions }
    }
}

impl RoiProvider for FixedRoiProvider {
    fn select_regions(&self, _frame: &dyn FrameBuffer) -> Vec<Roi> {
        self.regions.clone()
    }
}

/// Forehead, left cheek and right cheek regions from the two eye centres
///
/// All sizes scale with the inter-eye distance `d`. The forehead sits `0.6 d`
/// above the left eye and spans `1.2 d x 0.4 d`; each cheek is `0.5 d` square,
/// `0.4 d` below its eye.
pub fn facial_rois_from_eyes(left_eye: Point, right_eye: Point) -> Vec<Roi> {
    let d = right_eye.x - left_eye.x;
    vec![
        Roi::new(left_eye.x - d * 0.1, left_eye.y - d * 0.6, d * 1.2, d * 0.4),
        Roi::new(left_eye.x - d * 0.3, left_eye.y + d * 0.4, d * 0.5, d * 0.5),
        Roi::new(right_eye.x - d * 0.2, right_eye.y + d * 0.4, d * 0.5, d * 0.5),
    ]
}

/// Mean RGB over the part of `roi` inside the frame
///
/// Returns `None` when the region does not overlap the frame or the frame holds
/// fewer than `width * height * 4` bytes.
pub fn extract_mean_color(frame: &dyn FrameBuffer, roi: &Roi) -> Option<RgbColor> {
    let (x0, y0, x1, y1) = roi.pixel_bounds(frame.width(), frame.height())?;
    let stride = frame.width() * 4;
    let data = frame.rgba();
    if data.len() < stride * frame.height() {
        return None;
    }

    let (mut red, mut green, mut blue) = (0u64, 0u64, 0u64);
    for y in y0..y1 {
        let row = data.get(y * stride + x0 * 4..y * stride + x1 * 4)?;
        for px in row.chunks_exact(4) {
            red += u64::from(px[0]);
            green += u64::from(px[1]);
            blue += u64::from(px[2]);
        }
    }

    let count = ((x1 - x0) * (y1 - y0)) as f64;
    Some(RgbColor {
        red: red as f64 / count,
        green: green as f64 / count,
        blue: blue as f64 / count,
    })
}

/// Average of the per-region means; regions outside the frame are skipped
pub fn extract_mean_color_multi(frame: &dyn FrameBuffer, rois: &[Roi]) -> Option<RgbColor> {
    let colors: Vec<RgbColor> = rois
        .iter()
        .filter_map(|roi| extract_mean_color(frame, roi))
        .collect();
    if colors.is_empty() {
        return None;
    }

    let n = colors.len() as f64;
    let sum = colors.iter().fold(RgbColor::default(), |acc, c| RgbColor {
        red: acc.red + c.red,
        green: acc.green + c.green,
        blue: acc.blue + c.blue,
    });
    Some(RgbColor {
        red: sum.red / n,
        green: sum.green / n,
        blue: sum.blue / n,
    })
}
