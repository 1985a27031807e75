//! silhouette-engine — Classification sessions on top of silhouette-core.
//!
//! Owns configuration, the per-camera body-shape session (throttling,
//! visibility gating, confidence disposition), the caller-owned skin-tone
//! analyzer, and a threaded session handle fed over a bounded channel.

pub mod analyzer;
pub mod config;
pub mod engine;
pub mod session;

pub use analyzer::{SkinToneAnalyzer, ToneAnalysis};
pub use config::{ConfigError, EngineConfig};
pub use engine::{spawn_session, EngineError, SessionHandle};
pub use session::{Advisory, BodyShapeSession, FrameOutcome, SkipReason, Verdict};
