use silhouette_core::{ClassifyError, Landmark, LandmarkError};
use silhouette_imaging::SampleError;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::config::{ConfigError, EngineConfig};
use crate::session::{Advisory, BodyShapeSession, FrameOutcome};

/// Frames that may wait for the session thread before `submit` blocks.
const FRAME_QUEUE_DEPTH: usize = 4;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("landmark error: {0}")]
    Landmark(#[from] LandmarkError),
    #[error("classification error: {0}")]
    Classify(#[from] ClassifyError),
    #[error("sampling error: {0}")]
    Sample(#[from] SampleError),
    #[error("no palette entry matched")]
    NoMatch,
    #[error("failed to spawn session thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("session thread exited")]
    ChannelClosed,
}

impl EngineError {
    /// The user-facing advisory for failures that mean "try again", if any.
    pub fn advisory(&self) -> Option<Advisory> {
        match self {
            EngineError::Sample(SampleError::NoValidSamples) => Some(Advisory::NoValidSamples),
            EngineError::Landmark(_) | EngineError::Classify(ClassifyError::Landmark(_)) => {
                Some(Advisory::MissingLandmarks)
            }
            _ => None,
        }
    }
}

/// Messages sent from callers to the session thread.
enum SessionRequest {
    Frame {
        landmarks: Vec<Landmark>,
        reply: oneshot::Sender<FrameOutcome>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
}

/// Clone-safe handle to a body-shape session thread.
///
/// The thread exits once every handle has been dropped.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    tx: mpsc::Sender<SessionRequest>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Submit one pose frame and wait for its outcome.
    pub async fn submit(&self, landmarks: Vec<Landmark>) -> Result<FrameOutcome, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest::Frame {
                landmarks,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Blocking variant of [`submit`](Self::submit) for callers outside an
    /// async runtime, such as a camera callback thread.
    ///
    /// Panics if called from within an async execution context.
    pub fn submit_blocking(&self, landmarks: Vec<Landmark>) -> Result<FrameOutcome, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .blocking_send(SessionRequest::Frame {
                landmarks,
                reply: reply_tx,
            })
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.blocking_recv().map_err(|_| EngineError::ChannelClosed)
    }

    /// Drop buffered history; the next frame starts a fresh stride.
    pub async fn reset(&self) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest::Reset { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Validate `config` and start a session thread that owns a
/// [`BodyShapeSession`]. Frames are classified strictly in submission order.
pub fn spawn_session(config: EngineConfig) -> Result<SessionHandle, EngineError> {
    config.validate()?;

    let id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<SessionRequest>(FRAME_QUEUE_DEPTH);
    let mut session = BodyShapeSession::new(&config);

    std::thread::Builder::new()
        .name("silhouette-session".into())
        .spawn(move || {
            tracing::info!(session = %id, "session thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    SessionRequest::Frame { landmarks, reply } => {
                        let outcome = session.on_frame(landmarks);
                        if let Some(advisory) = outcome.advisory() {
                            tracing::debug!(session = %id, %advisory, "advisory raised");
                        }
                        let _ = reply.send(outcome);
                    }
                    SessionRequest::Reset { reply } => {
                        session.reset();
                        tracing::info!(session = %id, "session reset");
                        let _ = reply.send(());
                    }
                }
            }
            tracing::info!(
                session = %id,
                frames = session.frames_seen(),
                "session thread exiting"
            );
        })?;

    Ok(SessionHandle { id, tx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SkipReason;
    use silhouette_core::types::pose;

    fn pose_frame() -> Vec<Landmark> {
        let mut frame = vec![Landmark::new(0.0, 0.0, 0.0, 1.0); 33];
        frame[pose::LEFT_SHOULDER] = Landmark::new(150.0, 100.0, 0.0, 1.0);
        frame[pose::RIGHT_SHOULDER] = Landmark::new(50.0, 100.0, 0.0, 1.0);
        frame[pose::LEFT_HIP] = Landmark::new(152.5, 300.0, 0.0, 1.0);
        frame[pose::RIGHT_HIP] = Landmark::new(47.5, 300.0, 0.0, 1.0);
        frame
    }

    #[tokio::test]
    async fn test_submit_follows_stride() {
        let handle = spawn_session(EngineConfig::default()).unwrap();
        for _ in 0..4 {
            let out = handle.submit(pose_frame()).await.unwrap();
            assert_eq!(
                out,
                FrameOutcome::Skipped {
                    reason: SkipReason::Throttled
                }
            );
        }
        let out = handle.submit(pose_frame()).await.unwrap();
        assert!(matches!(out, FrameOutcome::Classified { .. }), "got {out:?}");
    }

    #[tokio::test]
    async fn test_reset_restarts_stride() {
        let handle = spawn_session(EngineConfig::default()).unwrap();
        for _ in 0..3 {
            handle.submit(pose_frame()).await.unwrap();
        }
        handle.reset().await.unwrap();
        for _ in 0..4 {
            assert!(handle.submit(pose_frame()).await.unwrap().is_skipped());
        }
        assert!(!handle.submit(pose_frame()).await.unwrap().is_skipped());
    }

    #[tokio::test]
    async fn test_cloned_handles_share_session() {
        let mut config = EngineConfig::default();
        config.body.frame_stride = 2;
        let a = spawn_session(config).unwrap();
        let b = a.clone();
        assert_eq!(a.id(), b.id());
        assert!(a.submit(pose_frame()).await.unwrap().is_skipped());
        // Second frame overall lands on the stride even though it comes from b.
        assert_eq!(
            b.submit(pose_frame()).await.unwrap(),
            FrameOutcome::Skipped {
                reason: SkipReason::InsufficientHistory
            }
        );
    }

    #[test]
    fn test_submit_blocking() {
        let mut config = EngineConfig::default();
        config.body.frame_stride = 1;
        config.smoothing.min_frames = 1;
        let handle = spawn_session(config).unwrap();
        let out = handle.submit_blocking(pose_frame()).unwrap();
        assert!(matches!(out, FrameOutcome::Classified { .. }), "got {out:?}");
    }

    #[test]
    fn test_invalid_config_refused() {
        let mut config = EngineConfig::default();
        config.confidence.flag = 0.9;
        assert!(matches!(
            spawn_session(config),
            Err(EngineError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_error_advisories() {
        assert_eq!(
            EngineError::Sample(SampleError::NoValidSamples).advisory(),
            Some(Advisory::NoValidSamples)
        );
        assert_eq!(
            EngineError::Landmark(LandmarkError::OutOfRange { index: 10, len: 0 }).advisory(),
            Some(Advisory::MissingLandmarks)
        );
        assert!(EngineError::ChannelClosed.advisory().is_none());
    }
}
