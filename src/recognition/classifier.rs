use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Read-only `{id, name}` projection of a user-trained gesture. Creation and
/// deletion of the underlying records belongs to the external storage
/// service; the pipeline only passes the names as a candidate label set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateGesture {
    pub id: String,
    pub name: String,
}

/// What the classifier is asked about a frame: either one expected gesture
/// (practice mode) or a set of trained candidates to choose among.
#[derive(Debug, Clone)]
pub enum ClassifyTarget {
    Expected {
        gesture_id: String,
        gesture_name: String,
    },
    Candidates(Vec<CandidateGesture>),
}

/// Structured verdict from one remote classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionOutcome {
    pub matched: bool,
    pub label: String,
    /// Remote self-assessment on a 0-100 scale.
    pub confidence: f32,
    pub feedback: String,
    pub suggestions: Vec<String>,
}

/// Failures at the remote-classifier boundary.
#[derive(Debug, Clone, Error)]
pub enum ClassifyError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("API key rejected by the gesture service")]
    Unauthorized,
    #[error("rate limited by the gesture service")]
    RateLimited,
    #[error("gesture service unreachable: {0}")]
    Transport(String),
    #[error("could not parse classifier response: {0}")]
    Malformed(String),
}

/// Remote vision classifier boundary.
///
/// Called with exactly one image per invocation. Repeated calls for the same
/// image may yield different confidence or feedback text; callers must not
/// assume idempotence.
pub trait GestureClassifier: Send + Sync {
    fn classify(
        &self,
        image_png: &[u8],
        target: &ClassifyTarget,
    ) -> impl Future<Output = Result<RecognitionOutcome, ClassifyError>> + Send;
}
