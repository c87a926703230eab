//! Experiment module.
//!
//! This module provides the measurement experiments:
//! - Per-target probing with failure isolation
//! - Aggregation of target results into batch results
//! - The baseline experiment over named input batches
//! - Blocking classification (DNS vs. content level)

pub mod aggregate;
pub mod baseline;
pub mod blocking;
pub mod prober;
pub mod types;

pub use aggregate::{aggregate, BatchAggregator};
pub use baseline::BaselineExperiment;
pub use blocking::BlockingClassifier;
pub use prober::{ProbeTimeouts, TargetProber};
pub use types::*;
