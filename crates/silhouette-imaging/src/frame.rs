//! RGBA frame type and image processing — YCbCr skin mask, CLAHE.

use silhouette_core::Rgb;
use thiserror::Error;

const BYTES_PER_PIXEL: usize = 4;

// YCbCr skin bounds (exclusive).
const SKIN_Y_MIN: f32 = 80.0;
const SKIN_CB_RANGE: (f32, f32) = (77.0, 127.0);
const SKIN_CR_RANGE: (f32, f32) = (133.0, 173.0);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SampleError {
    #[error("invalid RGBA length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("no valid samples")]
    NoValidSamples,
    #[error("point ({x}, {y}) outside {width}x{height} frame")]
    OutOfBounds {
        x: f32,
        y: f32,
        width: u32,
        height: u32,
    },
}

/// An RGBA pixel buffer (alpha is carried but ignored).
#[derive(Clone)]
pub struct PixelFrame {
    /// Packed RGBA bytes (width * height * 4).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for PixelFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl PixelFrame {
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32) -> Result<Self, SampleError> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(SampleError::InvalidLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// A frame filled with one opaque colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = std::iter::repeat([rgb[0], rgb[1], rgb[2], 255])
            .take(width as usize * height as usize)
            .flatten()
            .collect();
        Self {
            data,
            width,
            height,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// RGB at (x, y), or `None` outside the frame.
    pub fn rgb_at(&self, x: i64, y: i64) -> Option<[u8; 3]> {
        if !self.contains(x, y) {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    pub fn set_rgb(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x < self.width && y < self.height {
            let i = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
            self.data[i..i + 3].copy_from_slice(&rgb);
        }
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|p| [p[0], p[1], p[2]])
    }

    /// Average pixel brightness (0.0–255.0), mean of R, G and B.
    pub fn avg_brightness(&self) -> f32 {
        if self.pixel_count() == 0 {
            return 0.0;
        }
        self.pixels()
            .map(|p| Rgb::from_u8(p[0], p[1], p[2]).brightness())
            .sum::<f32>()
            / self.pixel_count() as f32
    }

    /// Grayscale plane using Rec. 601 luma weights.
    pub fn luma(&self) -> Vec<u8> {
        self.pixels()
            .map(|[r, g, b]| luma(r, g, b).round().clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Per-pixel skin classification, row-major.
    pub fn skin_mask(&self) -> Vec<bool> {
        self.pixels().map(|[r, g, b]| is_skin(r, g, b)).collect()
    }
}

fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Convert RGB to full-range YCbCr (JPEG / BT.601).
pub fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    (y, cb, cr)
}

/// Skin test in YCbCr space: `Y > 80`, `77 < Cb < 127`, `133 < Cr < 173`.
pub fn is_skin(r: u8, g: u8, b: u8) -> bool {
    let (y, cb, cr) = rgb_to_ycbcr(r, g, b);
    y > SKIN_Y_MIN
        && cb > SKIN_CB_RANGE.0
        && cb < SKIN_CB_RANGE.1
        && cr > SKIN_CR_RANGE.0
        && cr < SKIN_CR_RANGE.1
}

/// Per-tile intensity maps for clip-limited adaptive equalization of a luma
/// plane. A single tile with `clip_limit >= 1.0` is plain global equalization.
struct ToneCurves {
    tiles: usize,
    tile_w: usize,
    tile_h: usize,
    curves: Vec<[f32; 256]>,
}

impl ToneCurves {
    /// `None` when the frame is smaller than one pixel per tile.
    fn build(luma: &[u8], width: u32, height: u32, tiles: u32, clip_limit: f32) -> Option<Self> {
        let (w, h) = (width as usize, height as usize);
        let tiles = tiles.max(1) as usize;
        let (tile_w, tile_h) = (w / tiles, h / tiles);
        if tile_w == 0 || tile_h == 0 || luma.len() < w * h {
            return None;
        }

        let clip = (clip_limit * (tile_w * tile_h) as f32).max(1.0);
        let curves = (0..tiles * tiles)
            .map(|i| {
                let (x0, y0) = ((i % tiles) * tile_w, (i / tiles) * tile_h);
                let mut hist = [0f32; 256];
                for row in luma[y0 * w..(y0 + tile_h) * w].chunks_exact(w) {
                    for &v in &row[x0..x0 + tile_w] {
                        hist[v as usize] += 1.0;
                    }
                }
                equalization_curve(clip_histogram(hist, clip))
            })
            .collect();

        Some(Self {
            tiles,
            tile_w,
            tile_h,
            curves,
        })
    }

    /// Equalized value of `v` at `(x, y)`, blended bilinearly between the
    /// curves of the four nearest tile centres.
    fn map(&self, x: usize, y: usize, v: u8) -> f32 {
        let last = (self.tiles - 1) as f32;
        let fx = (x as f32 / self.tile_w as f32 - 0.5).clamp(0.0, last);
        let fy = (y as f32 / self.tile_h as f32 - 0.5).clamp(0.0, last);
        let (c0, r0) = (fx as usize, fy as usize);
        let (c1, r1) = ((c0 + 1).min(self.tiles - 1), (r0 + 1).min(self.tiles - 1));
        let (dx, dy) = (fx - c0 as f32, fy - r0 as f32);

        let at = |r: usize, c: usize| self.curves[r * self.tiles + c][v as usize];
        let top = at(r0, c0) + (at(r0, c1) - at(r0, c0)) * dx;
        let bottom = at(r1, c0) + (at(r1, c1) - at(r1, c0)) * dx;
        top + (bottom - top) * dy
    }
}

/// Cap every bin at `clip` and spread the removed mass evenly over all bins.
fn clip_histogram(mut hist: [f32; 256], clip: f32) -> [f32; 256] {
    let excess: f32 = hist.iter().map(|&n| (n - clip).max(0.0)).sum();
    let share = excess / 256.0;
    for n in hist.iter_mut() {
        *n = n.min(clip) + share;
    }
    hist
}

/// Normalized cumulative histogram scaled to 0..=255. A tile whose mass sits
/// in a single bin maps to the identity.
fn equalization_curve(hist: [f32; 256]) -> [f32; 256] {
    let mut curve = [0f32; 256];
    let mut total = 0.0;
    for (c, n) in curve.iter_mut().zip(hist) {
        total += n;
        *c = total;
    }

    let floor = curve.iter().copied().find(|&c| c > 0.0).unwrap_or(0.0);
    let span = total - floor;
    if span <= f32::EPSILON {
        return std::array::from_fn(|i| i as f32);
    }
    curve.map(|c| ((c - floor) / span * 255.0).clamp(0.0, 255.0))
}

/// Contrast pre-pass for colour frames.
///
/// Equalizes the luma plane tile by tile, then scales each pixel's RGB by
/// `equalized / luma` so hue is roughly preserved. Black pixels are left
/// untouched.
pub fn enhance_contrast(frame: &mut PixelFrame, tiles: u32, clip_limit: f32) {
    let luma = frame.luma();
    let Some(curves) = ToneCurves::build(&luma, frame.width, frame.height, tiles, clip_limit)
    else {
        tracing::debug!(
            width = frame.width,
            height = frame.height,
            tiles,
            "frame too small for contrast tiles"
        );
        return;
    };

    let w = frame.width as usize;
    for (i, (px, &old)) in frame
        .data
        .chunks_exact_mut(BYTES_PER_PIXEL)
        .zip(&luma)
        .enumerate()
    {
        if old == 0 {
            continue;
        }
        let gain = curves.map(i % w, i / w, old) / old as f32;
        for c in px.iter_mut().take(3) {
            *c = (*c as f32 * gain).round().clamp(0.0, 255.0) as u8;
        }
    }

    tracing::debug!(
        width = frame.width,
        height = frame.height,
        tiles,
        clip_limit,
        "contrast enhanced"
    );
}
