pub mod controller;
pub mod cycle;
pub mod loop_worker;

pub use controller::CaptureController;
pub use cycle::{
    run_cycle, CycleError, CycleEvent, CyclePhase, CycleReport, FailureAdvice, GATE_CONFIDENCE,
};
pub use loop_worker::DEFAULT_CAPTURE_INTERVAL_MS;
