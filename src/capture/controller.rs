use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::detection::EstimatorConfig;
use crate::frame::FrameSource;
use crate::progress::ProgressTracker;
use crate::recognition::{ClassifyTarget, GestureClassifier};

use super::cycle::{run_cycle, CycleError, CycleEvent, CyclePhase, CycleReport};
use super::loop_worker::{capture_loop, DEFAULT_CAPTURE_INTERVAL_MS};

/// Owns the capture pipeline for one user session: manual one-shot cycles
/// and the optional timer-driven auto-capture loop.
///
/// Collaborators are injected at construction so the controller can run
/// against fakes. Terminal results flow over the `events` sender; the
/// current phase is observable through [`CaptureController::phase`].
pub struct CaptureController<S, C> {
    source: Arc<S>,
    classifier: Arc<C>,
    estimator_cfg: EstimatorConfig,
    tracker: Arc<ProgressTracker>,
    events: mpsc::UnboundedSender<CycleEvent>,
    interval: Duration,
    phase_tx: watch::Sender<CyclePhase>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl<S, C> CaptureController<S, C>
where
    S: FrameSource + 'static,
    C: GestureClassifier + 'static,
{
    pub fn new(
        source: Arc<S>,
        classifier: Arc<C>,
        tracker: Arc<ProgressTracker>,
        events: mpsc::UnboundedSender<CycleEvent>,
    ) -> Self {
        let (phase_tx, _) = watch::channel(CyclePhase::Idle);
        Self {
            source,
            classifier,
            estimator_cfg: EstimatorConfig::default(),
            tracker,
            events,
            interval: Duration::from_millis(DEFAULT_CAPTURE_INTERVAL_MS),
            phase_tx,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_estimator_config(mut self, cfg: EstimatorConfig) -> Self {
        self.estimator_cfg = cfg;
        self
    }

    /// Watch the current cycle phase.
    pub fn phase(&self) -> watch::Receiver<CyclePhase> {
        self.phase_tx.subscribe()
    }

    pub fn is_auto_capturing(&self) -> bool {
        self.handle.is_some()
    }

    /// Run exactly one cycle for `target` and return its result. The
    /// terminal event is also emitted, so a listening presentation layer
    /// sees manual and timed cycles the same way.
    ///
    /// Refused while auto-capture is running: the loop owns the single
    /// in-flight cycle slot, and a manual capture on top of it could put a
    /// second remote call in flight.
    pub async fn capture_once(&self, target: &ClassifyTarget) -> Result<CycleReport, CycleError> {
        if self.handle.is_some() {
            return Err(CycleError::AutoCaptureActive);
        }

        let cancel = CancellationToken::new();
        let result = run_cycle(
            target,
            self.source.as_ref(),
            self.classifier.as_ref(),
            &self.estimator_cfg,
            &self.tracker,
            &cancel,
            &self.phase_tx,
        )
        .await;
        let _ = self.phase_tx.send(CyclePhase::Idle);

        match &result {
            Ok(report) => {
                let _ = self.events.send(CycleEvent::Completed(report.clone()));
            }
            Err(CycleError::Cancelled) => {}
            Err(err) => {
                let _ = self.events.send(CycleEvent::Failed { error: err.clone() });
            }
        }

        result
    }

    /// Start capturing `target` on the configured interval. Errors if a loop
    /// is already running; stop it first before switching targets so no
    /// cycle keeps running against a stale selection.
    pub fn start_auto_capture(&mut self, target: ClassifyTarget) -> Result<()> {
        if self.handle.is_some() {
            bail!("auto-capture already active");
        }

        info!("starting auto-capture every {:?}", self.interval);
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(capture_loop(
            target,
            Arc::clone(&self.source),
            Arc::clone(&self.classifier),
            self.estimator_cfg.clone(),
            Arc::clone(&self.tracker),
            self.events.clone(),
            self.phase_tx.clone(),
            self.interval,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancel the auto-capture loop and wait for it to wind down. Any cycle
    /// still in flight is abandoned and its result discarded.
    pub async fn stop_auto_capture(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("capture loop task failed to join")?;
        }
        Ok(())
    }
}
