//! Configuration module.
//!
//! This module provides functionality for loading experiment settings,
//! resolver lists and input batches.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{
    BlockingSettings, ExperimentConfig, DEFAULT_BLOCKING_HOST, DEFAULT_BLOCKING_MARKER,
    DEFAULT_BLOCKING_PATH,
};
