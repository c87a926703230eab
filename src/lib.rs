//! blockcheck - censorship measurement from the vantage point of the host.
//!
//! This crate provides both a library API and a CLI tool for:
//! - Probing lists of URLs with HTTP, DNS and traceroute, keeping every
//!   failure as data instead of aborting
//! - Aggregating per-target results into per-batch records
//! - Classifying blocking as DNS-level or content-level by comparing what
//!   different resolvers lead to
//!
//! # Library Usage
//!
//! ```ignore
//! use blockcheck::{BaselineExperiment, InputBatch, TargetProber, TracerouteMethod};
//!
//! let prober = TargetProber::new(http, dns, tracer, TracerouteMethod::available(false), timeouts);
//! let report = BaselineExperiment::new(prober, 8)
//!     .run(vec![InputBatch::new("world", ["example.com", "https://example.org/x,news"])])
//!     .await;
//!
//! let verdict = BlockingClassifier::new(http, dns, BlockingSettings::default(), timeout)
//!     .classify()
//!     .await?;
//! println!("{}", verdict.summary());
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Baseline probing of two input batches
//! sudo blockcheck baseline country.csv world.txt --output report.json
//!
//! # Blocking classification
//! blockcheck classify --host example.com --path / --marker "Example Domain"
//! blockcheck classify --dns 8.8.8.8#Google --dns 1.1.1.1#Cloudflare
//!
//! # Inspect normalization of an input line
//! blockcheck normalize "'example.com/path',news"
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod experiment;
pub mod probe;
pub mod target;

// Re-export commonly used types
pub use cli::{Cli, Commands, OutputFormat};
pub use config::{BlockingSettings, ConfigLoader, ExperimentConfig};
pub use error::{Error, Result};
pub use experiment::{
    BaselineExperiment, BatchResult, BlockingClassifier, BlockingVerdict, Classification,
    ExperimentReport, InputBatch, ProbeTimeouts, TargetProber, TargetResult,
};
pub use probe::{DnsServer, ProbeOutcome, TracerouteMethod};
pub use target::{normalize_line, TargetDescriptor};
