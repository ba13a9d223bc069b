use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::detection::EstimatorConfig;
use crate::frame::FrameSource;
use crate::progress::ProgressTracker;
use crate::recognition::{ClassifyTarget, GestureClassifier};

use super::cycle::{run_cycle, CycleError, CycleEvent, CyclePhase};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_error, log_info, log_warn};

/// Auto-capture cadence when none is configured.
pub const DEFAULT_CAPTURE_INTERVAL_MS: u64 = 3000;
/// Hard ceiling on one cycle, frame grab through remote response.
const CYCLE_TIMEOUT_SECS: u64 = 30;

/// Timer-driven auto-capture loop.
///
/// Cycles run inline in the tick arm with `MissedTickBehavior::Skip`, so a
/// tick that fires while a prior cycle is still in flight is skipped, never
/// queued — at most one cycle (and one remote call) is in flight per loop.
/// Cancelling the token tears the loop down at the next await point and any
/// in-flight cycle's result is discarded.
pub(crate) async fn capture_loop<S, C>(
    target: ClassifyTarget,
    source: Arc<S>,
    classifier: Arc<C>,
    estimator_cfg: EstimatorConfig,
    tracker: Arc<ProgressTracker>,
    events: mpsc::UnboundedSender<CycleEvent>,
    phase: watch::Sender<CyclePhase>,
    interval: Duration,
    cancel_token: CancellationToken,
) where
    S: FrameSource,
    C: GestureClassifier,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first interval tick resolves immediately; consume it so the first
    // capture happens one full interval after enabling, like the UI timer did.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let cycle = tokio::time::timeout(
                    Duration::from_secs(CYCLE_TIMEOUT_SECS),
                    run_cycle(
                        &target,
                        source.as_ref(),
                        classifier.as_ref(),
                        &estimator_cfg,
                        &tracker,
                        &cancel_token,
                        &phase,
                    ),
                );

                tokio::select! {
                    result = cycle => {
                        match result {
                            Ok(Ok(report)) => {
                                log_info!(
                                    "cycle {} completed: {} ({:.0}% confidence)",
                                    report.id, report.outcome.label, report.outcome.confidence
                                );
                                let _ = events.send(CycleEvent::Completed(report));
                            }
                            Ok(Err(CycleError::Cancelled)) => {
                                log_info!("cycle result discarded after cancellation");
                            }
                            Ok(Err(err)) => {
                                log_warn!("capture cycle failed: {err}");
                                let _ = events.send(CycleEvent::Failed { error: err });
                            }
                            Err(_) => {
                                log_error!("capture cycle timeout (> {CYCLE_TIMEOUT_SECS}s)");
                                let _ = events.send(CycleEvent::Failed {
                                    error: CycleError::RemoteUnavailable("cycle timed out".into()),
                                });
                            }
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        log_info!("in-flight cycle abandoned, auto-capture disabled");
                        break;
                    }
                }

                let _ = phase.send(CyclePhase::Idle);
            }
            _ = cancel_token.cancelled() => {
                log_info!("auto-capture loop shutting down");
                break;
            }
        }
    }

    let _ = phase.send(CyclePhase::Idle);
}
