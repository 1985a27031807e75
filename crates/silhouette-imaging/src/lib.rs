//! silhouette-imaging — Pixel-level helpers for skin-tone analysis.
//!
//! Wraps raw RGBA buffers, builds YCbCr skin masks, applies CLAHE-based
//! contrast enhancement, and samples colours at points or over regions.

pub mod frame;
pub mod sampler;

pub use frame::{PixelFrame, SampleError};
pub use sampler::{region_average, sample_points, BrightnessWindow};
