//! Skin-tone palette and nearest-reference colour matching.
//!
//! The palette is a fixed static table indexed by [`SkinTone`]. Matching
//! picks the entry with the smallest RGB Euclidean distance to a sampled
//! colour; a coarse brightness/warmth bucketing is kept as a fast path.

use serde::{Deserialize, Serialize};

use crate::types::{ClassificationResult, Rgb};

/// Largest possible RGB distance: `sqrt(3 * 255²)`.
pub const MAX_RGB_DISTANCE: f32 = 441.672_96;

/// Red minus blue above which the fast path calls a colour warm.
const WARMTH_THRESHOLD: f32 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Undertone {
    Warm,
    Cool,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkinTone {
    FairCool,
    FairWarm,
    LightCool,
    LightNeutral,
    LightWarm,
    MediumCool,
    MediumNeutral,
    MediumWarm,
    DeepCool,
    DeepWarm,
}

/// One palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToneReference {
    pub tone: SkinTone,
    pub display_name: &'static str,
    pub color: Rgb,
    pub undertone: Undertone,
}

/// Reference palette, in [`SkinTone`] declaration order.
pub static PALETTE: [ToneReference; 10] = [
    ToneReference {
        tone: SkinTone::FairCool,
        display_name: "Fair Cool",
        color: Rgb::new(247.0, 222.0, 214.0),
        undertone: Undertone::Cool,
    },
    ToneReference {
        tone: SkinTone::FairWarm,
        display_name: "Fair Warm",
        color: Rgb::new(250.0, 221.0, 196.0),
        undertone: Undertone::Warm,
    },
    ToneReference {
        tone: SkinTone::LightCool,
        display_name: "Light Cool",
        color: Rgb::new(232.0, 196.0, 184.0),
        undertone: Undertone::Cool,
    },
    ToneReference {
        tone: SkinTone::LightNeutral,
        display_name: "Light Neutral",
        color: Rgb::new(234.0, 195.0, 172.0),
        undertone: Undertone::Neutral,
    },
    ToneReference {
        tone: SkinTone::LightWarm,
        display_name: "Light Warm",
        color: Rgb::new(236.0, 194.0, 160.0),
        undertone: Undertone::Warm,
    },
    ToneReference {
        tone: SkinTone::MediumCool,
        display_name: "Medium Cool",
        color: Rgb::new(198.0, 152.0, 136.0),
        undertone: Undertone::Cool,
    },
    ToneReference {
        tone: SkinTone::MediumNeutral,
        display_name: "Medium Neutral",
        color: Rgb::new(200.0, 151.0, 122.0),
        undertone: Undertone::Neutral,
    },
    ToneReference {
        tone: SkinTone::MediumWarm,
        display_name: "Medium Warm",
        color: Rgb::new(205.0, 150.0, 107.0),
        undertone: Undertone::Warm,
    },
    ToneReference {
        tone: SkinTone::DeepCool,
        display_name: "Deep Cool",
        color: Rgb::new(125.0, 84.0, 76.0),
        undertone: Undertone::Cool,
    },
    ToneReference {
        tone: SkinTone::DeepWarm,
        display_name: "Deep Warm",
        color: Rgb::new(141.0, 85.0, 54.0),
        undertone: Undertone::Warm,
    },
];

impl SkinTone {
    pub const ALL: [SkinTone; 10] = [
        SkinTone::FairCool,
        SkinTone::FairWarm,
        SkinTone::LightCool,
        SkinTone::LightNeutral,
        SkinTone::LightWarm,
        SkinTone::MediumCool,
        SkinTone::MediumNeutral,
        SkinTone::MediumWarm,
        SkinTone::DeepCool,
        SkinTone::DeepWarm,
    ];

    /// This tone's palette entry.
    pub fn reference(&self) -> &'static ToneReference {
        &PALETTE[*self as usize]
    }

    pub fn display_name(&self) -> &'static str {
        self.reference().display_name
    }

    pub fn undertone(&self) -> Undertone {
        self.reference().undertone
    }

    pub fn reference_color(&self) -> Rgb {
        self.reference().color
    }
}

impl std::fmt::Display for SkinTone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Outcome of matching a colour against a palette.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToneMatch {
    pub tone: SkinTone,
    /// RGB distance to the chosen reference.
    pub distance: f32,
    /// `1 - distance / MAX_RGB_DISTANCE`.
    pub confidence: f32,
}

impl ToneMatch {
    pub fn into_result(self) -> ClassificationResult<SkinTone> {
        ClassificationResult::new(self.tone, self.confidence)
    }
}

/// Strategy for picking a palette entry for a sampled colour.
pub trait ToneMatcher {
    fn nearest(&self, color: Rgb, palette: &[ToneReference]) -> Option<ToneMatch>;
}

/// Nearest neighbour by RGB Euclidean distance. Ties keep the earlier entry.
pub struct EuclideanMatcher;

impl ToneMatcher for EuclideanMatcher {
    fn nearest(&self, color: Rgb, palette: &[ToneReference]) -> Option<ToneMatch> {
        let mut best: Option<(usize, f32)> = None;

        for (i, entry) in palette.iter().enumerate() {
            let d = color.distance(&entry.color);
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((i, d));
            }
        }

        best.map(|(i, distance)| ToneMatch {
            tone: palette[i].tone,
            distance,
            confidence: (1.0 - distance / MAX_RGB_DISTANCE).clamp(0.0, 1.0),
        })
    }
}

/// Match against the built-in [`PALETTE`].
pub fn match_tone(color: Rgb) -> ToneMatch {
    let m = EuclideanMatcher
        .nearest(color, &PALETTE)
        .unwrap_or(ToneMatch {
            tone: SkinTone::MediumNeutral,
            distance: MAX_RGB_DISTANCE,
            confidence: 0.0,
        });
    tracing::debug!(
        color = %color.to_hex(),
        tone = ?m.tone,
        distance = m.distance,
        "skin tone matched"
    );
    m
}

/// Coarse classification from brightness band and red/blue warmth.
///
/// Skips distance matching entirely and only ever yields the eight
/// warm/cool tones.
pub fn heuristic_tone(color: Rgb) -> SkinTone {
    let brightness = color.brightness();
    let warm = color.warmth() > WARMTH_THRESHOLD;

    match (brightness, warm) {
        (b, true) if b > 200.0 => SkinTone::FairWarm,
        (b, false) if b > 200.0 => SkinTone::FairCool,
        (b, true) if b > 150.0 => SkinTone::LightWarm,
        (b, false) if b > 150.0 => SkinTone::LightCool,
        (b, true) if b > 100.0 => SkinTone::MediumWarm,
        (b, false) if b > 100.0 => SkinTone::MediumCool,
        (_, true) => SkinTone::DeepWarm,
        (_, false) => SkinTone::DeepCool,
    }
}
