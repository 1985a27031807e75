//! Body-shape classification from bust, waist and hip widths.
//!
//! Widths are turned into unitless ratios and run through an ordered
//! decision list; the first matching rule wins.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anatomy::Torso;
use crate::types::{ClassificationResult, Landmark, LandmarkError};

/// Widths at or below this make every ratio meaningless.
const MIN_WIDTH: f32 = 1e-6;
/// Confidence multiplier for the no-rule-matched fallbacks.
const FALLBACK_CONFIDENCE_FACTOR: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyShape {
    Hourglass,
    Pear,
    Rectangle,
    InvertedTriangle,
    Apple,
}

impl BodyShape {
    /// Every shape, in tie-break order.
    pub const ALL: [BodyShape; 5] = [
        BodyShape::Hourglass,
        BodyShape::Pear,
        BodyShape::Rectangle,
        BodyShape::InvertedTriangle,
        BodyShape::Apple,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            BodyShape::Hourglass => "hourglass",
            BodyShape::Pear => "pear",
            BodyShape::Rectangle => "rectangle",
            BodyShape::InvertedTriangle => "inverted-triangle",
            BodyShape::Apple => "apple",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BodyShape::Hourglass => "Hourglass",
            BodyShape::Pear => "Pear",
            BodyShape::Rectangle => "Rectangle",
            BodyShape::InvertedTriangle => "Inverted Triangle",
            BodyShape::Apple => "Apple",
        }
    }
}

impl std::fmt::Display for BodyShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error(transparent)]
    Landmark(#[from] LandmarkError),
    #[error("degenerate geometry: bust={bust}, waist={waist}, hip={hip}")]
    DegenerateGeometry { bust: f32, waist: f32, hip: f32 },
}

/// Torso widths plus the mean visibility of the six points they came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeMeasurements {
    pub bust: f32,
    pub waist: f32,
    pub hip: f32,
    pub visibility: f32,
}

/// Unitless proportions derived from [`ShapeMeasurements`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapeRatios {
    pub bust_to_hip: f32,
    pub waist_to_hip: f32,
    pub waist_to_bust: f32,
    pub waist_definition: f32,
    pub bust_hip_difference: f32,
    pub waist_proportion_difference: f32,
}

impl ShapeMeasurements {
    pub fn from_widths(bust: f32, waist: f32, hip: f32, visibility: f32) -> Self {
        Self {
            bust,
            waist,
            hip,
            visibility,
        }
    }

    /// Derive bust, waist and hip widths from an averaged pose frame.
    pub fn from_pose(frame: &[Landmark]) -> Result<Self, ClassifyError> {
        let torso = Torso::from_pose(frame)?;
        let bust = torso.bust();
        let waist = torso.waist().points;
        let hips = torso.hips();

        let visibility = [
            bust.left, bust.right, waist.left, waist.right, hips.left, hips.right,
        ]
        .iter()
        .map(|p| p.visibility)
        .sum::<f32>()
            / 6.0;

        let (bust, waist, hip) = (bust.width(), waist.width(), hips.width());
        if torso.is_collapsed() {
            return Err(ClassifyError::DegenerateGeometry { bust, waist, hip });
        }

        Ok(Self {
            bust,
            waist,
            hip,
            visibility,
        })
    }

    pub fn ratios(&self) -> Result<ShapeRatios, ClassifyError> {
        let (bust, waist, hip) = (self.bust, self.waist, self.hip);
        let degenerate = [bust, waist, hip]
            .iter()
            .any(|w| !w.is_finite() || *w <= MIN_WIDTH);
        if degenerate {
            return Err(ClassifyError::DegenerateGeometry { bust, waist, hip });
        }

        Ok(ShapeRatios {
            bust_to_hip: bust / hip,
            waist_to_hip: waist / hip,
            waist_to_bust: waist / bust,
            waist_definition: 1.0 - 2.0 * waist / (bust + hip),
            bust_hip_difference: (bust - hip).abs() / bust.max(hip),
            waist_proportion_difference: (2.0 * waist - (bust + hip)).abs() / (bust + hip),
        })
    }
}

/// Run the ordered rule list over a set of measurements.
///
/// The returned confidence is clamped to [0, 1].
pub fn classify(
    m: &ShapeMeasurements,
) -> Result<ClassificationResult<BodyShape>, ClassifyError> {
    let r = m.ratios()?;
    let vis = m.visibility;

    let (shape, confidence) = if r.waist_definition > 0.20
        && r.bust_hip_difference < 0.10
        && r.waist_to_hip < 0.75
        && r.waist_to_bust < 0.75
    {
        let c = (r.waist_definition * 1.5)
            .min((1.0 - r.bust_hip_difference) * 2.0)
            .min(1.0 - r.waist_to_hip);
        (BodyShape::Hourglass, c * vis)
    } else if r.bust_to_hip < 0.85 && r.waist_to_hip < 0.80 {
        (
            BodyShape::Pear,
            (0.95 - r.bust_to_hip) * (1.0 - r.waist_to_hip) * vis,
        )
    } else if r.bust_to_hip > 1.10 {
        (BodyShape::InvertedTriangle, (r.bust_to_hip - 1.05) * vis)
    } else if r.waist_to_hip > 0.85 && r.waist_to_bust > 0.85 {
        (BodyShape::Apple, (r.waist_to_hip - 0.85) * vis * 0.9)
    } else if r.waist_definition < 0.15
        && r.bust_hip_difference < 0.15
        && r.waist_proportion_difference < 0.15
        && r.waist_to_hip > 0.75
        && r.waist_to_hip < 0.90
    {
        (
            BodyShape::Rectangle,
            (1.0 - r.bust_hip_difference) * (1.0 - r.waist_proportion_difference) * vis,
        )
    } else if r.waist_definition > 0.15 && r.bust_hip_difference < 0.15 {
        (
            BodyShape::Hourglass,
            r.waist_definition * vis * FALLBACK_CONFIDENCE_FACTOR,
        )
    } else {
        (
            BodyShape::Rectangle,
            (1.0 - r.waist_proportion_difference) * vis * FALLBACK_CONFIDENCE_FACTOR,
        )
    };

    tracing::debug!(
        bust = m.bust,
        waist = m.waist,
        hip = m.hip,
        bust_to_hip = r.bust_to_hip,
        waist_to_hip = r.waist_to_hip,
        waist_definition = r.waist_definition,
        shape = shape.id(),
        confidence,
        "body shape classified"
    );

    Ok(ClassificationResult::new(shape, confidence))
}

/// Classify directly from an averaged pose frame.
pub fn classify_pose(frame: &[Landmark]) -> Result<ClassificationResult<BodyShape>, ClassifyError> {
    classify(&ShapeMeasurements::from_pose(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::pose;

    const EPS: f32 = 1e-3;

    fn widths(bust: f32, waist: f32, hip: f32) -> ShapeMeasurements {
        ShapeMeasurements::from_widths(bust, waist, hip, 1.0)
    }

    fn pose_frame(shoulder_half: f32, hip_half: f32, visibility: f32) -> Vec<Landmark> {
        let mut frame = vec![Landmark::new(0.5, 0.5, 0.0, visibility); pose::MIN_LANDMARKS];
        frame[pose::LEFT_SHOULDER] = Landmark::new(0.5 + shoulder_half, 0.3, 0.0, visibility);
        frame[pose::RIGHT_SHOULDER] = Landmark::new(0.5 - shoulder_half, 0.3, 0.0, visibility);
        frame[pose::LEFT_HIP] = Landmark::new(0.5 + hip_half, 0.7, 0.0, visibility);
        frame[pose::RIGHT_HIP] = Landmark::new(0.5 - hip_half, 0.7, 0.0, visibility);
        frame
    }

    #[test]
    fn test_hourglass_scenario() {
        let result = classify(&widths(100.0, 60.0, 105.0)).unwrap();
        assert_eq!(result.category, BodyShape::Hourglass);
        assert!(
            (result.confidence - 0.4286).abs() < EPS,
            "confidence = {}",
            result.confidence
        );
    }

    #[test]
    fn test_pear_scenario() {
        let result = classify(&widths(70.0, 75.0, 100.0)).unwrap();
        assert_eq!(result.category, BodyShape::Pear);
        assert!((result.confidence - 0.0625).abs() < EPS);

        let half_visible = ShapeMeasurements::from_widths(70.0, 75.0, 100.0, 0.5);
        let result = classify(&half_visible).unwrap();
        assert!((result.confidence - 0.03125).abs() < EPS);
    }

    #[test]
    fn test_ratios_scenario_values() {
        let r = widths(100.0, 60.0, 105.0).ratios().unwrap();
        assert!((r.waist_to_hip - 0.5714).abs() < EPS);
        assert!((r.waist_to_bust - 0.6).abs() < EPS);
        assert!((r.bust_hip_difference - 0.0476).abs() < EPS);
        assert!((r.waist_definition - 0.4146).abs() < EPS);
    }

    #[test]
    fn test_inverted_triangle_precedes_apple() {
        // Satisfies both rule 3 (bust/hip > 1.10) and rule 4 (waist > 0.85 of both).
        let m = widths(120.0, 110.0, 100.0);
        let r = m.ratios().unwrap();
        assert!(r.waist_to_hip > 0.85 && r.waist_to_bust > 0.85);
        let result = classify(&m).unwrap();
        assert_eq!(result.category, BodyShape::InvertedTriangle);
        assert!((result.confidence - 0.15).abs() < EPS);
    }

    #[test]
    fn test_apple() {
        let result = classify(&widths(100.0, 95.0, 100.0)).unwrap();
        assert_eq!(result.category, BodyShape::Apple);
        assert!((result.confidence - 0.09).abs() < EPS);
    }

    #[test]
    fn test_rectangle() {
        let m = widths(96.0, 84.0, 100.0);
        let r = m.ratios().unwrap();
        assert!(r.waist_definition < 0.15);
        let result = classify(&m).unwrap();
        assert_eq!(result.category, BodyShape::Rectangle);
        // (1 - 0.04) * (1 - 28/196)
        assert!((result.confidence - 0.8229).abs() < EPS, "confidence = {}", result.confidence);
    }

    #[test]
    fn test_fallback_hourglass() {
        // waist_definition ~0.18 misses rule 1 (> 0.20) and rule 5 (< 0.15).
        let m = widths(100.0, 80.0, 95.0);
        let r = m.ratios().unwrap();
        assert!(r.waist_definition > 0.15 && r.waist_definition < 0.20);
        let result = classify(&m).unwrap();
        assert_eq!(result.category, BodyShape::Hourglass);
        assert!((result.confidence - r.waist_definition * 0.7).abs() < EPS);
    }

    #[test]
    fn test_fallback_rectangle() {
        // waist/hip 0.91 blocks rule 5, waist/bust 0.84 blocks apple.
        let m = widths(108.0, 91.0, 100.0);
        let result = classify(&m).unwrap();
        assert_eq!(result.category, BodyShape::Rectangle);
        // (1 - 26/208) * 0.7
        assert!((result.confidence - 0.6125).abs() < EPS, "confidence = {}", result.confidence);
    }

    #[test]
    fn test_degenerate_widths_rejected() {
        assert!(matches!(
            classify(&widths(0.0, 0.5, 1.0)),
            Err(ClassifyError::DegenerateGeometry { .. })
        ));
        assert!(matches!(
            classify(&widths(1.0, f32::NAN, 1.0)),
            Err(ClassifyError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_from_pose_widths_and_visibility() {
        let frame = pose_frame(0.1, 0.1, 1.0);
        let m = ShapeMeasurements::from_pose(&frame).unwrap();
        assert!((m.bust - 0.176).abs() < 1e-5);
        assert!((m.waist - 0.2).abs() < 1e-5);
        assert!((m.hip - 0.2).abs() < 1e-5);
        // Bust points carry 0.9 of shoulder visibility.
        assert!((m.visibility - (0.9 * 2.0 + 4.0) / 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_ratios_independent_of_point_order() {
        let frame = pose_frame(0.12, 0.1, 0.9);
        let mut mirrored = frame.clone();
        mirrored.swap(pose::LEFT_HIP, pose::RIGHT_HIP);
        mirrored.swap(pose::LEFT_SHOULDER, pose::RIGHT_SHOULDER);
        let a = ShapeMeasurements::from_pose(&frame).unwrap().ratios().unwrap();
        let b = ShapeMeasurements::from_pose(&mirrored).unwrap().ratios().unwrap();
        assert!((a.waist_definition - b.waist_definition).abs() < 1e-5);
        assert!((a.bust_hip_difference - b.bust_hip_difference).abs() < 1e-5);
    }

    #[test]
    fn test_classify_pose_short_frame() {
        let frame = vec![Landmark::default(); 12];
        assert!(matches!(
            classify_pose(&frame),
            Err(ClassifyError::Landmark(LandmarkError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_collapsed_left_side_fails_instead_of_classifying() {
        // Left hip half a thousandth below the left shoulder: the bust
        // lateral cannot be oriented, so its width would shrink to ~1e-4.
        let mut frame = pose_frame(0.1, 0.2, 1.0);
        frame[pose::LEFT_SHOULDER] = Landmark::new(0.6, 0.3, 0.0, 1.0);
        frame[pose::LEFT_HIP] = Landmark::new(0.6, 0.3005, 0.0, 1.0);
        assert!(matches!(
            classify_pose(&frame),
            Err(ClassifyError::DegenerateGeometry { .. })
        ));
    }
}
