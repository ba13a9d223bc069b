pub mod classifier;
pub mod openai;

pub use classifier::{
    CandidateGesture, ClassifyError, ClassifyTarget, GestureClassifier, RecognitionOutcome,
};
pub use openai::OpenAiClient;
