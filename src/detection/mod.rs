pub mod config;
pub mod estimator;

pub use config::EstimatorConfig;
pub use estimator::{estimate, estimate_encoded, PresenceVerdict};
