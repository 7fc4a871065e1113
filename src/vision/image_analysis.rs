// src/vision/image_analysis.rs
//! Photoscreening image analysis over a frame buffer
//!
//! Face and eye detection stay with the caller; this module measures the red
//! reflex inside each detected pupil, locates corneal light reflexes for the
//! Hirschberg test, scores overall image quality and turns all of it into
//! [`PhotoscreeningFindings`].

use super::photoscreening::{AlignmentFinding, PhotoscreeningFindings, PupilSymmetry, RedReflexStatus};
use crate::acquisition::{FrameBuffer, Point, RgbColor};
use crate::config::constants::vision;
use crate::screening::Side;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Face bounding box in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// 0.0-1.0
    pub confidence: f64,
}

/// Eye bounding box with the detected pupil centre
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeDetection {
    pub side: Side,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub pupil_x: f64,
    pub pupil_y: f64,
    /// 0.0-1.0
    pub confidence: f64,
}

impl EyeDetection {
    pub fn pupil(&self) -> Point {
        Point {
            x: self.pupil_x,
            y: self.pupil_y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflexQuality {
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedReflexAnalysis {
    /// Mean channel value, 0-255
    pub brightness: f64,
    pub color: RgbColor,
    pub quality: ReflexQuality,
    /// Leukocoria: every channel above the white level
    pub white_reflex_detected: bool,
}

impl RedReflexAnalysis {
    pub fn status(&self) -> RedReflexStatus {
        red_reflex_status(self)
    }
}

/// Sample a disc of radius `0.3 * min(width, height)` around the pupil on a 2 px grid
pub fn analyze_red_reflex_in_region<F: FrameBuffer + ?Sized>(frame: &F, eye: &EyeDetection) -> RedReflexAnalysis {
    const SAMPLE_STEP: f64 = 2.0;
    let radius = eye.width.min(eye.height) * 0.3;

    let (mut red, mut green, mut blue) = (0.0, 0.0, 0.0);
    let mut count = 0usize;

    let mut dy = -radius;
    while dy <= radius {
        let mut dx = -radius;
        while dx <= radius {
            if dx.hypot(dy) <= radius {
                let x = (eye.pupil_x + dx).round();
                let y = (eye.pupil_y + dy).round();
                if x >= 0.0 && y >= 0.0 {
                    if let Some([r, g, b, _]) = frame.pixel(x as usize, y as usize) {
                        red += f64::from(r);
                        green += f64::from(g);
                        blue += f64::from(b);
                        count += 1;
                    }
                }
            }
            dx += SAMPLE_STEP;
        }
        dy += SAMPLE_STEP;
    }

    if count == 0 {
        debug!(side = ?eye.side, "red reflex region lies outside the frame");
        return RedReflexAnalysis {
            brightness: 0.0,
            color: RgbColor::default(),
            quality: ReflexQuality::Poor,
            white_reflex_detected: false,
        };
    }

    let n = count as f64;
    let color = RgbColor {
        red: red / n,
        green: green / n,
        blue: blue / n,
    };
    let brightness = (color.red + color.green + color.blue) / 3.0;
    let white_reflex_detected = color.red > vision::WHITE_REFLEX_LEVEL
        && color.green > vision::WHITE_REFLEX_LEVEL
        && color.blue > vision::WHITE_REFLEX_LEVEL;

    let quality = if brightness > 100.0 && !white_reflex_detected {
        ReflexQuality::Good
    } else if brightness > 50.0 {
        ReflexQuality::Fair
    } else {
        ReflexQuality::Poor
    };

    RedReflexAnalysis {
        brightness,
        color,
        quality,
        white_reflex_detected,
    }
}

/// White reflex is abnormal, a poor sample is unclear
pub fn red_reflex_status(analysis: &RedReflexAnalysis) -> RedReflexStatus {
    if analysis.white_reflex_detected {
        RedReflexStatus::Abnormal
    } else if analysis.quality == ReflexQuality::Poor {
        RedReflexStatus::Unclear
    } else {
        RedReflexStatus::Normal
    }
}

/// Centroid of the brightest pixels inside the eye box, the corneal light reflex
pub fn locate_corneal_reflex<F: FrameBuffer + ?Sized>(frame: &F, eye: &EyeDetection) -> Option<Point> {
    const BRIGHT_FRACTION: f64 = 0.95;

    let x0 = eye.x.max(0.0).floor() as usize;
    let y0 = eye.y.max(0.0).floor() as usize;
    let x1 = ((eye.x + eye.width).max(0.0).ceil() as usize).min(frame.width());
    let y1 = ((eye.y + eye.height).max(0.0).ceil() as usize).min(frame.height());
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let peak = (y0..y1)
        .flat_map(|y| (x0..x1).map(move |x| (x, y)))
        .map(|(x, y)| frame.luma(x, y))
        .fold(0.0f64, f64::max);
    if peak <= 0.0 {
        return None;
    }

    let cutoff = peak * BRIGHT_FRACTION;
    let (mut sum_x, mut sum_y, mut count) = (0.0, 0.0, 0usize);
    for y in y0..y1 {
        for x in x0..x1 {
            if frame.luma(x, y) >= cutoff {
                sum_x += x as f64;
                sum_y += y as f64;
                count += 1;
            }
        }
    }

    (count > 0).then(|| Point {
        x: sum_x / count as f64,
        y: sum_y / count as f64,
    })
}

/// Hirschberg corneal reflex test result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HirschbergAnalysis {
    pub left_reflex: Point,
    pub right_reflex: Point,
    /// Degrees, from the horizontal
    pub deviation_angle: f64,
    pub prism_diopters: f64,
    pub alignment: AlignmentFinding,
}

/// Compare reflex displacement between the eyes
///
/// Each reflex is measured relative to its own pupil; the left-minus-right
/// difference is scaled by the interpupillary distance at 7 prism dioptres per
/// percent. Deviations above 10 prism dioptres are classified by their
/// dominant axis.
pub fn analyze_eye_alignment(
    left: &EyeDetection,
    right: &EyeDetection,
    left_reflex: Point,
    right_reflex: Point,
) -> HirschbergAnalysis {
    const PRISM_PER_PERCENT: f64 = 7.0;
    const STRABISMUS_PRISM: f64 = 10.0;

    let horizontal = (left_reflex.x - left.pupil_x) - (right_reflex.x - right.pupil_x);
    let vertical = (left_reflex.y - left.pupil_y) - (right_reflex.y - right.pupil_y);
    let deviation_angle = vertical.abs().atan2(horizontal.abs()).to_degrees();
    let interpupillary = (right.pupil_x - left.pupil_x).abs();

    if interpupillary == 0.0 {
        return HirschbergAnalysis {
            left_reflex,
            right_reflex,
            deviation_angle,
            prism_diopters: 0.0,
            alignment: AlignmentFinding::Unclear,
        };
    }

    let prism_diopters = horizontal.hypot(vertical) / interpupillary * 100.0 * PRISM_PER_PERCENT;
    let alignment = if prism_diopters <= STRABISMUS_PRISM {
        AlignmentFinding::Normal
    } else if horizontal.abs() > vertical.abs() {
        if horizontal < 0.0 {
            AlignmentFinding::Esotropia
        } else {
            AlignmentFinding::Exotropia
        }
    } else if vertical < 0.0 {
        AlignmentFinding::Hypertropia
    } else {
        AlignmentFinding::Hypotropia
    };

    HirschbergAnalysis {
        left_reflex,
        right_reflex,
        deviation_angle,
        prism_diopters,
        alignment,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageQuality {
    /// 0-100
    pub sharpness: f64,
    /// Mean brightness, percent of full scale
    pub brightness: f64,
    /// Brightness range, percent of full scale
    pub contrast: f64,
    /// No issues and brightness and contrast inside the usable band
    pub acceptable: bool,
    /// "Image too dark", "Low contrast" and similar, in check order
    pub issues: Vec<String>,
}

pub fn assess_image_quality<F: FrameBuffer + ?Sized>(frame: &F) -> ImageQuality {
    let width = frame.width();
    let height = frame.height();
    let data = frame.rgba();
    let pixels = width * height;

    if pixels == 0 || data.len() < pixels * 4 {
        return ImageQuality {
            sharpness: 0.0,
            brightness: 0.0,
            contrast: 0.0,
            acceptable: false,
            issues: vec!["Empty image".to_string()],
        };
    }

    let mut total = 0.0;
    let mut min_level = 255.0f64;
    let mut max_level = 0.0f64;
    for p in data.chunks_exact(4).take(pixels) {
        let level = (f64::from(p[0]) + f64::from(p[1]) + f64::from(p[2])) / 3.0;
        total += level;
        min_level = min_level.min(level);
        max_level = max_level.max(level);
    }
    let brightness = total / pixels as f64 / 255.0 * 100.0;
    let contrast = (max_level - min_level) / 255.0 * 100.0;

    // Forward-difference gradient magnitude on the red channel
    let mut edge_strength = 0.0;
    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let here = f64::from(data[(y * width + x) * 4]);
            let right = f64::from(data[(y * width + x + 1) * 4]);
            let down = f64::from(data[((y + 1) * width + x) * 4]);
            edge_strength += (here - right).hypot(here - down);
        }
    }
    let sharpness = (edge_strength / pixels as f64 * 10.0).min(100.0);

    let mut issues = Vec::new();
    if brightness < 30.0 {
        issues.push("Image too dark".to_string());
    }
    if brightness > 80.0 {
        issues.push("Image too bright".to_string());
    }
    if contrast < 20.0 {
        issues.push("Low contrast".to_string());
    }
    if sharpness < 30.0 {
        issues.push("Image blurry".to_string());
    }

    let acceptable = issues.is_empty() && brightness > 30.0 && brightness < 80.0 && contrast > 20.0;

    ImageQuality {
        sharpness,
        brightness,
        contrast,
        acceptable,
        issues,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureGuidance {
    /// Face width within the usable pixel range
    pub distance_ok: bool,
    /// Brightness strictly between 30% and 80%
    pub lighting_ok: bool,
    /// Face centre close enough to the frame centre
    pub alignment_ok: bool,
    /// First problem to fix, or a ready message
    pub message: String,
}

impl CaptureGuidance {
    pub fn ready(&self) -> bool {
        self.distance_ok && self.lighting_ok && self.alignment_ok
    }
}

/// One instruction for the person in front of the camera, most pressing first
pub fn provide_capture_guidance(
    face: Option<&FaceDetection>,
    quality: &ImageQuality,
    frame_width: f64,
) -> CaptureGuidance {
    let Some(face) = face else {
        return CaptureGuidance {
            distance_ok: false,
            lighting_ok: false,
            alignment_ok: false,
            message: "No face detected. Please position yourself in front of the camera.".to_string(),
        };
    };

    let distance_ok = face.width > vision::MIN_FACE_WIDTH_PX && face.width < vision::MAX_FACE_WIDTH_PX;
    let lighting_ok = quality.brightness > 30.0 && quality.brightness < 80.0;
    let alignment_ok = (face.x + face.width / 2.0 - frame_width / 2.0).abs() < vision::MAX_CENTER_OFFSET_PX;

    let message = if !distance_ok {
        if face.width < vision::MIN_FACE_WIDTH_PX {
            "Move closer to the camera"
        } else {
            "Move further from the camera"
        }
    } else if !lighting_ok {
        if quality.brightness < 30.0 {
            "Increase lighting"
        } else {
            "Reduce lighting"
        }
    } else if !alignment_ok {
        "Center your face in the frame"
    } else {
        "Perfect! Hold still..."
    };

    CaptureGuidance {
        distance_ok,
        lighting_ok,
        alignment_ok,
        message: message.to_string(),
    }
}

/// Full photo analysis: both reflexes, Hirschberg alignment and pupil symmetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoAnalysis {
    pub left_reflex: RedReflexAnalysis,
    pub right_reflex: RedReflexAnalysis,
    pub hirschberg: Option<HirschbergAnalysis>,
    pub quality: ImageQuality,
    pub findings: PhotoscreeningFindings,
}

/// Analyse one flash photo given the detected eyes
///
/// Pupil symmetry compares reflex brightness between the eyes (Bruckner test).
/// Confidence starts from the weaker eye detection and drops by 20 points when
/// the image itself is not acceptable.
pub fn analyze_photoscreen<F: FrameBuffer + ?Sized>(
    frame: &F,
    left: &EyeDetection,
    right: &EyeDetection,
) -> PhotoAnalysis {
    const SYMMETRY_RATIO: f64 = 0.8;
    const QUALITY_PENALTY: f64 = 20.0;

    let left_reflex = analyze_red_reflex_in_region(frame, left);
    let right_reflex = analyze_red_reflex_in_region(frame, right);
    let quality = assess_image_quality(frame);

    let hirschberg = match (locate_corneal_reflex(frame, left), locate_corneal_reflex(frame, right)) {
        (Some(l), Some(r)) => Some(analyze_eye_alignment(left, right, l, r)),
        _ => None,
    };
    let eye_alignment = hirschberg
        .map(|h| h.alignment)
        .unwrap_or(AlignmentFinding::Unclear);

    let pupil_symmetry = if left_reflex.quality == ReflexQuality::Poor || right_reflex.quality == ReflexQuality::Poor {
        PupilSymmetry::Unclear
    } else {
        let brighter = left_reflex.brightness.max(right_reflex.brightness);
        let dimmer = left_reflex.brightness.min(right_reflex.brightness);
        if brighter <= 0.0 {
            PupilSymmetry::Unclear
        } else if dimmer / brighter >= SYMMETRY_RATIO {
            PupilSymmetry::Symmetric
        } else {
            PupilSymmetry::Asymmetric
        }
    };

    let mut confidence = left.confidence.min(right.confidence).clamp(0.0, 1.0) * 100.0;
    if !quality.acceptable {
        confidence = (confidence - QUALITY_PENALTY).max(0.0);
    }

    let findings = PhotoscreeningFindings {
        red_reflex_left: left_reflex.status(),
        red_reflex_right: right_reflex.status(),
        eye_alignment,
        pupil_symmetry,
        confidence,
    };

    debug!(
        ?findings,
        quality_ok = quality.acceptable,
        "photoscreen analysed"
    );

    PhotoAnalysis {
        left_reflex,
        right_reflex,
        hirschberg,
        quality,
        findings,
    }
}
