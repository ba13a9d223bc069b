use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::error;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::detection::{estimate, EstimatorConfig, PresenceVerdict};
use crate::frame::FrameSource;
use crate::progress::ProgressTracker;
use crate::recognition::{ClassifyError, ClassifyTarget, GestureClassifier, RecognitionOutcome};

/// Minimum presence confidence to let a frame through to the remote call.
pub const GATE_CONFIDENCE: f32 = 0.3;

/// Where a cycle currently is. `Done`/`Failed` are conveyed as terminal
/// [`CycleEvent`]s, after which the phase returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CyclePhase {
    Idle,
    CaptureRequested,
    PresenceChecking,
    Recognizing,
}

/// How the user should react to a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAdvice {
    /// Transient; retrying the capture is fine.
    Retry,
    /// Remote backpressure; wait before retrying.
    Backoff,
    /// Needs a settings change, retrying as-is will fail again.
    Reconfigure,
}

/// Everything that can end a capture cycle short of a recognition outcome.
#[derive(Debug, Clone, Error)]
pub enum CycleError {
    #[error("camera feed unavailable, check the camera and try again")]
    FrameUnavailable,
    #[error("captured frame could not be encoded, retry the capture: {0}")]
    EncodingFailed(String),
    #[error("auto-capture is running, stop it before capturing manually")]
    AutoCaptureActive,
    #[error("no hand detected, reposition your hand in view and retry")]
    NoHandDetected { confidence: f32 },
    #[error("gesture service unreachable, try again shortly: {0}")]
    RemoteUnavailable(String),
    #[error("API key rejected, update it in settings")]
    InvalidCredential,
    #[error("rate limited by the gesture service, wait a moment before retrying")]
    RateLimited,
    #[error("gesture service sent an unreadable response: {0}")]
    MalformedResponse(String),
    /// The owning session was torn down while the cycle was in flight. Never
    /// surfaced as an event; the result is simply discarded.
    #[error("capture cycle cancelled")]
    Cancelled,
}

impl CycleError {
    pub fn advice(&self) -> FailureAdvice {
        match self {
            CycleError::FrameUnavailable
            | CycleError::EncodingFailed(_)
            | CycleError::NoHandDetected { .. }
            | CycleError::RemoteUnavailable(_)
            | CycleError::MalformedResponse(_)
            | CycleError::Cancelled => FailureAdvice::Retry,
            CycleError::RateLimited => FailureAdvice::Backoff,
            CycleError::InvalidCredential | CycleError::AutoCaptureActive => {
                FailureAdvice::Reconfigure
            }
        }
    }
}

impl From<ClassifyError> for CycleError {
    fn from(err: ClassifyError) -> Self {
        match err {
            ClassifyError::MissingCredential | ClassifyError::Unauthorized => {
                CycleError::InvalidCredential
            }
            ClassifyError::RateLimited => CycleError::RateLimited,
            ClassifyError::Transport(msg) => CycleError::RemoteUnavailable(msg),
            ClassifyError::Malformed(msg) => CycleError::MalformedResponse(msg),
        }
    }
}

/// Result of one completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub id: Uuid,
    pub verdict: PresenceVerdict,
    pub outcome: RecognitionOutcome,
    pub completed_at: DateTime<Utc>,
}

/// Terminal cycle notification toward the presentation layer.
#[derive(Debug, Clone)]
pub enum CycleEvent {
    Completed(CycleReport),
    Failed { error: CycleError },
}

/// One full capture cycle: grab a frame, run the local presence gate, and
/// only if it passes, spend a remote classification call and record the
/// attempt.
///
/// The gate and the remote call are strictly sequential; the gate exists to
/// avoid the remote call. Progress is recorded exactly once, and only for
/// `Expected` targets — free recognition has no per-gesture ledger entry.
/// If `cancel` fires before the outcome is applied, the result is discarded
/// with [`CycleError::Cancelled`]; an attempt already recorded is not rolled
/// back.
pub async fn run_cycle<S, C>(
    target: &ClassifyTarget,
    source: &S,
    classifier: &C,
    estimator_cfg: &EstimatorConfig,
    tracker: &ProgressTracker,
    cancel: &CancellationToken,
    phase: &watch::Sender<CyclePhase>,
) -> Result<CycleReport, CycleError>
where
    S: FrameSource,
    C: GestureClassifier,
{
    let _ = phase.send(CyclePhase::CaptureRequested);
    let frame = source
        .capture_frame()
        .await
        .ok_or(CycleError::FrameUnavailable)?;

    let _ = phase.send(CyclePhase::PresenceChecking);
    let frame = Arc::new(frame);

    // Pixel work stays off the async thread; the estimator itself never
    // fails, so a lost worker just reads as an absent verdict.
    let verdict = tokio::task::spawn_blocking({
        let frame = Arc::clone(&frame);
        let cfg = estimator_cfg.clone();
        move || estimate(&frame, &cfg)
    })
    .await
    .unwrap_or_else(|err| {
        error!("presence estimation worker failed: {err}");
        PresenceVerdict::absent()
    });

    if !verdict.present || verdict.confidence < GATE_CONFIDENCE {
        return Err(CycleError::NoHandDetected {
            confidence: verdict.confidence,
        });
    }

    let _ = phase.send(CyclePhase::Recognizing);
    let png = tokio::task::spawn_blocking({
        let frame = Arc::clone(&frame);
        move || frame.to_png()
    })
    .await
    .map_err(|err| CycleError::EncodingFailed(err.to_string()))?
    .map_err(|err| CycleError::EncodingFailed(err.to_string()))?;

    let outcome = classifier.classify(&png, target).await?;

    if cancel.is_cancelled() {
        return Err(CycleError::Cancelled);
    }

    if let ClassifyTarget::Expected { gesture_id, .. } = target {
        tracker.record_attempt(gesture_id, outcome.matched);
    }

    Ok(CycleReport {
        id: Uuid::new_v4(),
        verdict,
        outcome,
        completed_at: Utc::now(),
    })
}
