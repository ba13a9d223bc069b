//! Gesture capture and recognition pipeline for AUSLAN practice.
//!
//! The pipeline sequences one capture cycle as: grab a still frame from a
//! [`frame::FrameSource`], run the local hand-presence gate
//! ([`detection::estimate`]), and only when the gate passes, spend a remote
//! classification call and record the attempt in the
//! [`progress::ProgressTracker`]. [`capture::CaptureController`] drives
//! manual and timer-driven cycles; [`sentence::SentenceAssembler`] turns a
//! run of recognized labels into a natural sentence.

pub mod capture;
pub mod config;
pub mod detection;
pub mod frame;
pub mod progress;
pub mod recognition;
pub mod sentence;
mod utils;

pub use capture::{
    CaptureController, CycleError, CycleEvent, CyclePhase, CycleReport, FailureAdvice,
};
pub use config::{ApiConfig, SettingsStore};
pub use detection::{EstimatorConfig, PresenceVerdict};
pub use frame::{FrameSource, StillFrame};
pub use progress::{MasteryEntry, ProgressLedger, ProgressTracker, MASTERY_THRESHOLD};
pub use recognition::{
    CandidateGesture, ClassifyError, ClassifyTarget, GestureClassifier, OpenAiClient,
    RecognitionOutcome,
};
pub use sentence::{SentenceAssembler, SentenceBackend};

/// Initialize logging for binaries and tests (reads RUST_LOG env var).
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
