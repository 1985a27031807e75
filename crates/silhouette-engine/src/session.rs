//! Per-stream body-shape session.
//!
//! A session owns the smoothing buffer for one camera stream. Frames are
//! pushed in arrival order; every frame is folded into the buffer but only
//! every `frame_stride`-th frame runs a classification cycle. A cycle never
//! fails: it ends in a [`FrameOutcome`] that is either a skip, an advisory for
//! the user, or a banded [`Verdict`].

use serde::Serialize;
use silhouette_core::body_shape::{self, BodyShape, ClassifyError};
use silhouette_core::types::mean_visibility;
use silhouette_core::{
    ClassificationResult, ConfidenceBand, ConfidenceThresholds, Landmark, SmoothingBuffer,
};

use crate::config::EngineConfig;

/// Why a frame produced no classification and no advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Not a stride frame.
    Throttled,
    /// Fewer than `min_frames` frames buffered.
    InsufficientHistory,
    /// Widths too small to form ratios.
    DegenerateGeometry,
}

/// User-facing message paired with a withheld or low-confidence result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Advisory {
    LowVisibility { mean_visibility: f32 },
    LowConfidence { confidence: f32 },
    RetryPosition { confidence: f32 },
    MissingLandmarks,
    NoValidSamples,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Advisory::LowVisibility { .. } => {
                "Please stand back and make sure your full body is visible"
            }
            Advisory::LowConfidence { .. } => "Low confidence result; consider retaking",
            Advisory::RetryPosition { .. } => {
                "Could not classify confidently; adjust your position and try again"
            }
            Advisory::MissingLandmarks => "Body landmarks not detected; step into the frame",
            Advisory::NoValidSamples => {
                "No usable skin samples; improve the lighting or try the quiz"
            }
        }
    }
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Disposition of a classification result by confidence band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "band", rename_all = "kebab-case")]
pub enum Verdict<C> {
    Accepted {
        result: ClassificationResult<C>,
    },
    Flagged {
        result: ClassificationResult<C>,
        advisory: Advisory,
    },
    Rejected {
        advisory: Advisory,
    },
}

impl<C: Copy> Verdict<C> {
    pub fn from_result(result: ClassificationResult<C>, thresholds: &ConfidenceThresholds) -> Self {
        let confidence = result.confidence;
        match ConfidenceBand::of(confidence, thresholds) {
            ConfidenceBand::Accept => Verdict::Accepted { result },
            ConfidenceBand::Flag => Verdict::Flagged {
                result,
                advisory: Advisory::LowConfidence { confidence },
            },
            ConfidenceBand::Reject => Verdict::Rejected {
                advisory: Advisory::RetryPosition { confidence },
            },
        }
    }

    /// The result channel: present for accepted and flagged verdicts.
    pub fn result(&self) -> Option<ClassificationResult<C>> {
        match self {
            Verdict::Accepted { result } | Verdict::Flagged { result, .. } => Some(*result),
            Verdict::Rejected { .. } => None,
        }
    }

    /// The advisory channel.
    pub fn advisory(&self) -> Option<Advisory> {
        match self {
            Verdict::Accepted { .. } => None,
            Verdict::Flagged { advisory, .. } | Verdict::Rejected { advisory } => Some(*advisory),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum FrameOutcome {
    Skipped { reason: SkipReason },
    Advisory { advisory: Advisory },
    Classified { verdict: Verdict<BodyShape> },
}

impl FrameOutcome {
    pub fn result(&self) -> Option<ClassificationResult<BodyShape>> {
        match self {
            FrameOutcome::Classified { verdict } => verdict.result(),
            _ => None,
        }
    }

    pub fn advisory(&self) -> Option<Advisory> {
        match self {
            FrameOutcome::Advisory { advisory } => Some(*advisory),
            FrameOutcome::Classified { verdict } => verdict.advisory(),
            FrameOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, FrameOutcome::Skipped { .. })
    }
}

pub struct BodyShapeSession {
    buffer: SmoothingBuffer,
    frame_stride: u32,
    min_mean_visibility: f32,
    thresholds: ConfidenceThresholds,
    frames_seen: u64,
}

impl BodyShapeSession {
    pub fn new(config: &EngineConfig) -> Self {
        let s = &config.smoothing;
        Self {
            buffer: SmoothingBuffer::new(s.buffer_size, s.min_frames, s.visibility_gate),
            frame_stride: config.body.frame_stride.max(1),
            min_mean_visibility: config.body.min_mean_visibility,
            thresholds: config.confidence,
            frames_seen: 0,
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Fold one pose frame into the session and, on stride frames, classify.
    pub fn on_frame(&mut self, frame: Vec<Landmark>) -> FrameOutcome {
        self.frames_seen += 1;
        let raw_visibility = mean_visibility(&frame);
        self.buffer.push(frame);

        if self.frames_seen % u64::from(self.frame_stride) != 0 {
            return FrameOutcome::Skipped {
                reason: SkipReason::Throttled,
            };
        }

        if raw_visibility < self.min_mean_visibility {
            tracing::debug!(
                frame = self.frames_seen,
                mean_visibility = raw_visibility,
                "frame below visibility gate"
            );
            return FrameOutcome::Advisory {
                advisory: Advisory::LowVisibility {
                    mean_visibility: raw_visibility,
                },
            };
        }

        let Some(averaged) = self.buffer.average() else {
            return FrameOutcome::Skipped {
                reason: SkipReason::InsufficientHistory,
            };
        };

        match body_shape::classify_pose(&averaged) {
            Ok(result) => {
                let verdict = Verdict::from_result(result, &self.thresholds);
                if let Verdict::Rejected { .. } = verdict {
                    tracing::warn!(
                        frame = self.frames_seen,
                        shape = result.category.id(),
                        confidence = result.confidence,
                        "classification rejected"
                    );
                }
                FrameOutcome::Classified { verdict }
            }
            Err(ClassifyError::Landmark(e)) => {
                tracing::debug!(frame = self.frames_seen, error = %e, "pose frame incomplete");
                FrameOutcome::Advisory {
                    advisory: Advisory::MissingLandmarks,
                }
            }
            Err(e @ ClassifyError::DegenerateGeometry { .. }) => {
                tracing::warn!(frame = self.frames_seen, error = %e, "degenerate torso geometry");
                FrameOutcome::Skipped {
                    reason: SkipReason::DegenerateGeometry,
                }
            }
        }
    }

    /// Drop buffered history and restart the frame counter.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.frames_seen = 0;
    }
}
