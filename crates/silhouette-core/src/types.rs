use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Vec3;

/// Pose landmark slots used by the body-shape path.
pub mod pose {
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    /// Minimum frame length that covers every slot above.
    pub const MIN_LANDMARKS: usize = 25;
}

/// Face-mesh landmark slots used by the skin-tone point sampler.
pub mod face {
    pub const FOREHEAD: usize = 10;
    pub const LEFT_CHEEK: usize = 234;
    pub const RIGHT_CHEEK: usize = 454;
    pub const CHIN: usize = 152;
    pub const SAMPLE_POINTS: [usize; 4] = [FOREHEAD, LEFT_CHEEK, RIGHT_CHEEK, CHIN];
    pub const MIN_LANDMARKS: usize = 468;
}

/// A tracked anatomical point in normalized scene units.
///
/// Also used for derived points (bust, waist), which share the same shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Visibility/confidence in [0, 1].
    #[serde(default = "full_visibility")]
    pub visibility: f32,
}

fn full_visibility() -> f32 {
    1.0
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn from_position(p: Vec3, visibility: f32) -> Self {
        Self::new(p.x, p.y, p.z, visibility)
    }

    /// 3D Euclidean distance to another point.
    pub fn distance_to(&self, other: &Landmark) -> f32 {
        (self.position() - other.position()).magnitude()
    }
}

/// One camera tick worth of landmarks, indexed positionally.
pub type LandmarkFrame = Vec<Landmark>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LandmarkError {
    #[error("landmark {index} missing: frame has {len} points")]
    OutOfRange { index: usize, len: usize },
}

/// Fetch a landmark by slot, failing if the frame is too short.
pub fn landmark_at(frame: &[Landmark], index: usize) -> Result<Landmark, LandmarkError> {
    frame.get(index).copied().ok_or(LandmarkError::OutOfRange {
        index,
        len: frame.len(),
    })
}

/// Mean visibility across every landmark of a frame (0.0 for an empty frame).
pub fn mean_visibility(frame: &[Landmark]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().map(|l| l.visibility).sum::<f32>() / frame.len() as f32
}

/// An RGB colour with floating-point channels in 0.0–255.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32, g as f32, b as f32)
    }

    /// Mean of the three channels.
    pub fn brightness(&self) -> f32 {
        (self.r + self.g + self.b) / 3.0
    }

    /// Red minus blue; positive values lean warm.
    pub fn warmth(&self) -> f32 {
        self.r - self.b
    }

    pub fn distance(&self, other: &Rgb) -> f32 {
        ((self.r - other.r).powi(2) + (self.g - other.g).powi(2) + (self.b - other.b).powi(2))
            .sqrt()
    }

    pub fn to_hex(&self) -> String {
        let c = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        format!("#{:02x}{:02x}{:02x}", c(self.r), c(self.g), c(self.b))
    }
}

/// A category with a bounded heuristic confidence in [0, 1].
///
/// Confidence is advisory, not a calibrated probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationResult<C> {
    pub category: C,
    pub confidence: f32,
}

impl<C> ClassificationResult<C> {
    /// Build a result, clamping the confidence into [0, 1].
    /// NaN collapses to 0.0.
    pub fn new(category: C, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            category,
            confidence,
        }
    }
}

/// Accept/flag/reject cut-offs applied to a result's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// At or above: accept outright.
    pub accept: f32,
    /// At or above (and below `accept`): accept with a low-confidence flag.
    pub flag: f32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            accept: 0.6,
            flag: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceBand {
    Accept,
    Flag,
    Reject,
}

impl ConfidenceBand {
    pub fn of(confidence: f32, thresholds: &ConfidenceThresholds) -> Self {
        if confidence >= thresholds.accept {
            ConfidenceBand::Accept
        } else if confidence >= thresholds.flag {
            ConfidenceBand::Flag
        } else {
            ConfidenceBand::Reject
        }
    }
}
