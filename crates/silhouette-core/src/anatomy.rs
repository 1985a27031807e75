//! Virtual bust and waist points derived from shoulder and hip landmarks.
//!
//! Pose models do not track the bust or waist directly, so both are placed
//! along the torso using fixed anthropometric ratios.

use crate::geometry::{self, Vec3};
use crate::types::{landmark_at, pose, Landmark, LandmarkError};

/// Bust height as a fraction of the shoulder→hip torso vector.
const BUST_HEIGHT_RATIO: f32 = 0.29;
/// Bust width relative to horizontal shoulder width.
const BUST_WIDTH_RATIO: f32 = 0.88;
/// Bust visibility relative to the matching shoulder.
const BUST_VISIBILITY_FACTOR: f32 = 0.9;
/// Waist height above the hip as a fraction of the shoulder→hip vector.
const WAIST_HEIGHT_RATIO: f32 = 0.42;
/// Relative shoulder/hip width mismatch above which the body counts as rotated.
const TWIST_THRESHOLD: f32 = 0.15;

/// The four observed torso corners.
#[derive(Debug, Clone, Copy)]
pub struct Torso {
    pub left_shoulder: Landmark,
    pub right_shoulder: Landmark,
    pub left_hip: Landmark,
    pub right_hip: Landmark,
}

/// Left/right pair of derived points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPair {
    pub left: Landmark,
    pub right: Landmark,
}

impl PointPair {
    /// 3D distance between the two points.
    pub fn width(&self) -> f32 {
        self.left.distance_to(&self.right)
    }
}

/// Waist placement, recording whether twist correction replaced the
/// independent per-side estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaistEstimate {
    pub points: PointPair,
    pub twist_corrected: bool,
}

impl Torso {
    /// Pull shoulders and hips out of a pose frame.
    pub fn from_pose(frame: &[Landmark]) -> Result<Self, LandmarkError> {
        Ok(Self {
            left_shoulder: landmark_at(frame, pose::LEFT_SHOULDER)?,
            right_shoulder: landmark_at(frame, pose::RIGHT_SHOULDER)?,
            left_hip: landmark_at(frame, pose::LEFT_HIP)?,
            right_hip: landmark_at(frame, pose::RIGHT_HIP)?,
        })
    }

    /// Horizontal (x/z) distance between the shoulders.
    pub fn shoulder_width(&self) -> f32 {
        geometry::horizontal_distance(
            self.left_shoulder.position(),
            self.right_shoulder.position(),
        )
    }

    /// Horizontal (x/z) distance between the hips.
    pub fn hip_width(&self) -> f32 {
        geometry::horizontal_distance(self.left_hip.position(), self.right_hip.position())
    }

    pub fn hips(&self) -> PointPair {
        PointPair {
            left: self.left_hip,
            right: self.right_hip,
        }
    }

    /// True when shoulder and hip widths disagree enough to indicate the
    /// body is turned away from the camera.
    pub fn is_twisted(&self) -> bool {
        let shoulder_width = self.shoulder_width();
        if shoulder_width <= geometry::NORMALIZE_EPSILON {
            return false;
        }
        (shoulder_width - self.hip_width()).abs() / shoulder_width > TWIST_THRESHOLD
    }

    /// True when the axis that orients the bust (left shoulder to left hip),
    /// or the midline used for twist correction, is too short in the image
    /// plane to yield a lateral direction.
    pub fn is_collapsed(&self) -> bool {
        let too_short = |axis: Vec3| {
            geometry::magnitude(geometry::cross_product(axis, geometry::FORWARD))
                <= geometry::NORMALIZE_EPSILON
        };
        let side = geometry::subtract(self.left_hip.position(), self.left_shoulder.position());
        if too_short(side) {
            return true;
        }
        if !self.is_twisted() {
            return false;
        }
        let shoulder_mid =
            geometry::midpoint(self.left_shoulder.position(), self.right_shoulder.position());
        let hip_mid = geometry::midpoint(self.left_hip.position(), self.right_hip.position());
        too_short(geometry::subtract(hip_mid, shoulder_mid))
    }

    /// Place left/right bust points 29% down the torso, spread to 88% of
    /// shoulder width.
    pub fn bust(&self) -> PointPair {
        let ls = self.left_shoulder.position();
        let rs = self.right_shoulder.position();
        let torso = geometry::subtract(self.left_hip.position(), ls);

        let center = geometry::midpoint(ls, rs) + torso * BUST_HEIGHT_RATIO;
        let half_width = self.shoulder_width() * BUST_WIDTH_RATIO / 2.0;
        let lateral = geometry::lateral_direction(torso);

        PointPair {
            left: Landmark::from_position(
                center + lateral * half_width,
                self.left_shoulder.visibility * BUST_VISIBILITY_FACTOR,
            ),
            right: Landmark::from_position(
                center - lateral * half_width,
                self.right_shoulder.visibility * BUST_VISIBILITY_FACTOR,
            ),
        }
    }

    /// Place left/right waist points 42% of the way up from each hip.
    ///
    /// When the torso looks rotated, a single centre line through the
    /// shoulder and hip midpoints is used instead and the waist width is
    /// blended from hip and shoulder widths.
    pub fn waist(&self) -> WaistEstimate {
        let left = side_waist(self.left_shoulder, self.left_hip);
        let right = side_waist(self.right_shoulder, self.right_hip);

        if !self.is_twisted() {
            return WaistEstimate {
                points: PointPair { left, right },
                twist_corrected: false,
            };
        }

        let shoulder_width = self.shoulder_width();
        let hip_width = self.hip_width();
        let shoulder_mid =
            geometry::midpoint(self.left_shoulder.position(), self.right_shoulder.position());
        let hip_mid = geometry::midpoint(self.left_hip.position(), self.right_hip.position());
        let axis = geometry::subtract(hip_mid, shoulder_mid);

        let center = hip_mid - axis * WAIST_HEIGHT_RATIO;
        let waist_width =
            hip_width * (1.0 - WAIST_HEIGHT_RATIO) + shoulder_width * WAIST_HEIGHT_RATIO;
        let lateral = geometry::lateral_direction(axis);
        let half_width = waist_width / 2.0;

        tracing::debug!(
            shoulder_width,
            hip_width,
            waist_width,
            "torso rotated; applying twist correction to waist"
        );

        WaistEstimate {
            points: PointPair {
                left: Landmark::from_position(center + lateral * half_width, left.visibility),
                right: Landmark::from_position(center - lateral * half_width, right.visibility),
            },
            twist_corrected: true,
        }
    }
}

fn side_waist(shoulder: Landmark, hip: Landmark) -> Landmark {
    let torso = geometry::subtract(hip.position(), shoulder.position());
    let point: Vec3 = hip.position() - torso * WAIST_HEIGHT_RATIO;
    Landmark::from_position(point, (shoulder.visibility + hip.visibility) / 2.0)
}
