//! Caller-owned skin-tone analyzer over raw RGBA frames.

use serde::Serialize;
use silhouette_core::skin_tone::{heuristic_tone, PALETTE};
use silhouette_core::{
    ConfidenceThresholds, EuclideanMatcher, Landmark, Rgb, SkinTone, ToneMatch, ToneMatcher,
};
use silhouette_imaging::frame::enhance_contrast;
use silhouette_imaging::sampler::face_sample_points;
use silhouette_imaging::{region_average, sample_points, BrightnessWindow, PixelFrame};

use crate::config::{EngineConfig, SkinConfig};
use crate::engine::EngineError;
use crate::session::Verdict;

/// Averaged colour, its palette match, and the banded verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToneAnalysis {
    pub color: Rgb,
    pub matched: ToneMatch,
    pub verdict: Verdict<SkinTone>,
}

pub struct SkinToneAnalyzer<M = EuclideanMatcher> {
    config: SkinConfig,
    thresholds: ConfidenceThresholds,
    matcher: M,
}

impl SkinToneAnalyzer<EuclideanMatcher> {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_matcher(config, EuclideanMatcher)
    }
}

impl<M: ToneMatcher> SkinToneAnalyzer<M> {
    pub fn with_matcher(config: &EngineConfig, matcher: M) -> Self {
        Self {
            config: config.skin,
            thresholds: config.confidence,
            matcher,
        }
    }

    /// Sample the single pixels under the forehead, cheek and chin landmarks
    /// of a face mesh (normalized coordinates).
    pub fn analyze_face(
        &self,
        frame: &PixelFrame,
        landmarks: &[Landmark],
    ) -> Result<ToneAnalysis, EngineError> {
        let points = face_sample_points(landmarks, frame.width, frame.height)?;
        let window = BrightnessWindow {
            min: self.config.brightness_min,
            max: self.config.brightness_max,
        };
        let color = sample_points(frame, &points, window)?;
        self.finish(color)
    }

    /// Average a square window centred on `(cx, cy)` in pixel coordinates,
    /// after the configured contrast enhancement and skin masking.
    pub fn analyze_region(
        &self,
        frame: &PixelFrame,
        cx: f32,
        cy: f32,
    ) -> Result<ToneAnalysis, EngineError> {
        let enhanced;
        let frame = if self.config.enhance_contrast {
            let mut copy = frame.clone();
            enhance_contrast(&mut copy, self.config.clahe_tiles, self.config.clahe_clip_limit);
            enhanced = copy;
            &enhanced
        } else {
            frame
        };

        let mask = self.config.apply_skin_mask.then(|| frame.skin_mask());
        let color = region_average(frame, cx, cy, self.config.region_size, mask.as_deref())?;
        self.finish(color)
    }

    /// Region analysis for an uploaded portrait: centre column, one third
    /// down from the top.
    pub fn analyze_upload(&self, frame: &PixelFrame) -> Result<ToneAnalysis, EngineError> {
        let cx = frame.width as f32 / 2.0;
        let cy = frame.height as f32 / 3.0;
        self.analyze_region(frame, cx, cy)
    }

    /// Coarse brightness/warmth bucketing of the unmasked region at `(cx, cy)`.
    pub fn quick_tone(&self, frame: &PixelFrame, cx: f32, cy: f32) -> Result<SkinTone, EngineError> {
        let color = region_average(frame, cx, cy, self.config.region_size, None)?;
        Ok(heuristic_tone(color))
    }

    fn finish(&self, color: Rgb) -> Result<ToneAnalysis, EngineError> {
        let matched = self.matcher.nearest(color, &PALETTE).ok_or(EngineError::NoMatch)?;
        tracing::debug!(
            color = %color.to_hex(),
            tone = ?matched.tone,
            confidence = matched.confidence,
            "skin tone analysed"
        );
        Ok(ToneAnalysis {
            color,
            matched,
            verdict: Verdict::from_result(matched.into_result(), &self.thresholds),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Advisory;
    use silhouette_core::skin_tone::ToneReference;
    use silhouette_core::types::face;
    use silhouette_imaging::SampleError;

    /// (205, 150, 107) is the Medium Warm reference colour.
    const MEDIUM_WARM: [u8; 3] = [205, 150, 107];

    fn face_mesh() -> Vec<Landmark> {
        let mut lms = vec![Landmark::default(); face::MIN_LANDMARKS];
        lms[face::FOREHEAD] = Landmark::new(0.5, 0.25, 0.0, 1.0);
        lms[face::LEFT_CHEEK] = Landmark::new(0.25, 0.5, 0.0, 1.0);
        lms[face::RIGHT_CHEEK] = Landmark::new(0.75, 0.5, 0.0, 1.0);
        lms[face::CHIN] = Landmark::new(0.5, 0.875, 0.0, 1.0);
        lms
    }

    #[test]
    fn test_face_exact_reference() {
        let analyzer = SkinToneAnalyzer::new(&EngineConfig::default());
        let frame = PixelFrame::filled(64, 64, MEDIUM_WARM);
        let a = analyzer.analyze_face(&frame, &face_mesh()).unwrap();
        assert_eq!(a.matched.tone, SkinTone::MediumWarm);
        assert_eq!(a.matched.distance, 0.0);
        assert!(matches!(a.verdict, Verdict::Accepted { .. }));
    }

    #[test]
    fn test_face_dark_frame_has_no_samples() {
        let analyzer = SkinToneAnalyzer::new(&EngineConfig::default());
        let frame = PixelFrame::filled(64, 64, [10, 10, 10]);
        let err = analyzer.analyze_face(&frame, &face_mesh()).unwrap_err();
        assert!(matches!(err, EngineError::Sample(SampleError::NoValidSamples)));
        assert_eq!(err.advisory(), Some(Advisory::NoValidSamples));
    }

    #[test]
    fn test_face_mesh_too_short() {
        let analyzer = SkinToneAnalyzer::new(&EngineConfig::default());
        let frame = PixelFrame::filled(8, 8, MEDIUM_WARM);
        let err = analyzer
            .analyze_face(&frame, &vec![Landmark::default(); 100])
            .unwrap_err();
        assert!(matches!(err, EngineError::Landmark(_)));
    }

    #[test]
    fn test_upload_samples_upper_centre() {
        let analyzer = SkinToneAnalyzer::new(&EngineConfig::default());
        // Top half Medium Warm, bottom half black; a 50px window at
        // (100, 100) in a 200x300 image stays within the top half.
        let mut frame = PixelFrame::filled(200, 300, [0, 0, 0]);
        for y in 0..150 {
            for x in 0..200 {
                frame.set_rgb(x, y, MEDIUM_WARM);
            }
        }
        let a = analyzer.analyze_upload(&frame).unwrap();
        assert_eq!(a.matched.tone, SkinTone::MediumWarm);
        assert_eq!(a.color, Rgb::new(205.0, 150.0, 107.0));
    }

    #[test]
    fn test_region_with_mask_ignores_background() {
        let mut config = EngineConfig::default();
        config.skin.apply_skin_mask = true;
        config.skin.region_size = 10;
        let analyzer = SkinToneAnalyzer::new(&config);

        let mut frame = PixelFrame::filled(10, 10, [20, 40, 200]);
        frame.set_rgb(5, 5, MEDIUM_WARM);
        let a = analyzer.analyze_region(&frame, 5.0, 5.0).unwrap();
        assert_eq!(a.matched.tone, SkinTone::MediumWarm);
    }

    #[test]
    fn test_region_with_enhancement_brightens_flat_frame() {
        let frame = PixelFrame::filled(64, 64, MEDIUM_WARM);
        let plain = SkinToneAnalyzer::new(&EngineConfig::default())
            .analyze_region(&frame, 32.0, 32.0)
            .unwrap();

        let mut config = EngineConfig::default();
        config.skin.enhance_contrast = true;
        let enhanced = SkinToneAnalyzer::new(&config)
            .analyze_region(&frame, 32.0, 32.0)
            .unwrap();

        // Clip-limited equalisation spreads a single-valued tile upwards.
        assert!(
            enhanced.color.brightness() > plain.color.brightness(),
            "{:?} vs {:?}",
            enhanced.color,
            plain.color
        );
    }

    #[test]
    fn test_region_outside_frame() {
        let analyzer = SkinToneAnalyzer::new(&EngineConfig::default());
        let frame = PixelFrame::filled(8, 8, MEDIUM_WARM);
        assert!(matches!(
            analyzer.analyze_region(&frame, 20.0, 2.0),
            Err(EngineError::Sample(SampleError::OutOfBounds { .. }))
        ));
    }

    #[test]
    fn test_quick_tone() {
        let analyzer = SkinToneAnalyzer::new(&EngineConfig::default());
        let frame = PixelFrame::filled(20, 20, [150, 110, 80]);
        assert_eq!(analyzer.quick_tone(&frame, 10.0, 10.0).unwrap(), SkinTone::MediumWarm);
    }

    struct EmptyMatcher;

    impl ToneMatcher for EmptyMatcher {
        fn nearest(&self, _: Rgb, _: &[ToneReference]) -> Option<ToneMatch> {
            None
        }
    }

    #[test]
    fn test_custom_matcher_without_match() {
        let analyzer = SkinToneAnalyzer::with_matcher(&EngineConfig::default(), EmptyMatcher);
        let frame = PixelFrame::filled(8, 8, MEDIUM_WARM);
        assert!(matches!(
            analyzer.analyze_region(&frame, 4.0, 4.0),
            Err(EngineError::NoMatch)
        ));
    }
}
