//! silhouette-core — Visual attribute classification engine.
//!
//! Turns smoothed 3D body landmarks into a body-shape category and sampled
//! skin colour into a skin-tone category, each with a heuristic confidence.
//! A quiz scorer provides the landmark-free fallback path.

pub mod anatomy;
pub mod body_shape;
pub mod geometry;
pub mod quiz;
pub mod skin_tone;
pub mod smoothing;
pub mod types;

pub use body_shape::{BodyShape, ClassifyError, ShapeMeasurements};
pub use geometry::Vec3;
pub use skin_tone::{EuclideanMatcher, SkinTone, ToneMatch, ToneMatcher, Undertone};
pub use smoothing::SmoothingBuffer;
pub use types::{
    ClassificationResult, ConfidenceBand, ConfidenceThresholds, Landmark, LandmarkError, Rgb,
};
