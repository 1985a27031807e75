//! Colour sampling: single pixels at landmark points, or square regions.

use silhouette_core::types::{face, landmark_at, Landmark, LandmarkError};
use silhouette_core::Rgb;

use crate::frame::{PixelFrame, SampleError};

/// Open brightness interval a point sample must fall inside to count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessWindow {
    pub min: f32,
    pub max: f32,
}

impl Default for BrightnessWindow {
    fn default() -> Self {
        Self {
            min: 30.0,
            max: 250.0,
        }
    }
}

impl BrightnessWindow {
    pub fn contains(&self, brightness: f32) -> bool {
        brightness > self.min && brightness < self.max
    }
}

/// Map the forehead, cheek and chin face landmarks into pixel coordinates.
pub fn face_sample_points(
    landmarks: &[Landmark],
    width: u32,
    height: u32,
) -> Result<Vec<(f32, f32)>, LandmarkError> {
    face::SAMPLE_POINTS
        .iter()
        .map(|&idx| {
            let lm = landmark_at(landmarks, idx)?;
            Ok((lm.x * width as f32, lm.y * height as f32))
        })
        .collect()
}

/// Average the single pixels under each point, discarding samples that are
/// outside the frame or whose brightness falls outside `window`.
pub fn sample_points(
    frame: &PixelFrame,
    points: &[(f32, f32)],
    window: BrightnessWindow,
) -> Result<Rgb, SampleError> {
    let mut sum = [0.0f32; 3];
    let mut count = 0usize;

    for &(x, y) in points {
        if !x.is_finite() || !y.is_finite() {
            tracing::debug!(x, y, "non-finite sample point");
            continue;
        }
        let Some([r, g, b]) = frame.rgb_at(x.floor() as i64, y.floor() as i64) else {
            tracing::debug!(x, y, "sample point outside frame");
            continue;
        };
        let c = Rgb::from_u8(r, g, b);
        if !window.contains(c.brightness()) {
            tracing::debug!(x, y, brightness = c.brightness(), "sample rejected by brightness");
            continue;
        }
        sum[0] += c.r;
        sum[1] += c.g;
        sum[2] += c.b;
        count += 1;
    }

    if count == 0 {
        return Err(SampleError::NoValidSamples);
    }
    let n = count as f32;
    Ok(Rgb::new(sum[0] / n, sum[1] / n, sum[2] / n))
}

/// Average every pixel in a `size`×`size` window centred on `(cx, cy)`.
///
/// The window is clipped to the frame. With a mask, only pixels flagged as
/// skin are counted.
pub fn region_average(
    frame: &PixelFrame,
    cx: f32,
    cy: f32,
    size: u32,
    mask: Option<&[bool]>,
) -> Result<Rgb, SampleError> {
    let (cxi, cyi) = (cx.floor() as i64, cy.floor() as i64);
    if !cx.is_finite() || !cy.is_finite() || !frame.contains(cxi, cyi) {
        return Err(SampleError::OutOfBounds {
            x: cx,
            y: cy,
            width: frame.width,
            height: frame.height,
        });
    }

    let half = size as i64 / 2;
    let x0 = (cxi - half).max(0);
    let y0 = (cyi - half).max(0);
    let x1 = (cxi - half + size as i64).min(frame.width as i64);
    let y1 = (cyi - half + size as i64).min(frame.height as i64);

    let mut sum = [0.0f32; 3];
    let mut count = 0usize;

    for y in y0..y1 {
        for x in x0..x1 {
            let idx = y as usize * frame.width as usize + x as usize;
            if let Some(m) = mask {
                if !m.get(idx).copied().unwrap_or(false) {
                    continue;
                }
            }
            if let Some([r, g, b]) = frame.rgb_at(x, y) {
                sum[0] += r as f32;
                sum[1] += g as f32;
                sum[2] += b as f32;
                count += 1;
            }
        }
    }

    tracing::debug!(cx, cy, size, counted = count, masked = mask.is_some(), "region sampled");

    if count == 0 {
        return Err(SampleError::NoValidSamples);
    }
    let n = count as f32;
    Ok(Rgb::new(sum[0] / n, sum[1] / n, sum[2] / n))
}
