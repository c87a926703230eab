//! Command-line interface (CLI) argument parsing module.
//!
//! This module provides CLI argument parsing using `clap`.
//! It supports the baseline experiment, blocking classification, and
//! inspecting how an input line is normalized.

use crate::probe::TracerouteMethod;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI argument parser using clap derive macro.
///
/// # Example
///
/// ```ignore
/// let cli = Cli::parse();
/// match cli.command {
///     Commands::Baseline { files, .. } => { /* ... */ }
///     Commands::Classify { .. } => { /* ... */ }
///     Commands::Normalize { line } => { /* ... */ }
/// }
/// ```
#[derive(Parser, Debug)]
#[command(
    name = "blockcheck",
    version,
    about = "Censorship measurement: baseline probing and DNS vs. content blocking detection",
    infer_subcommands = true
)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Configuration file (JSON)
    #[arg(short, long, global = true, env = "BLOCKCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default, human-readable)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Get all available output format names.
    #[must_use]
    pub fn names() -> &'static [&'static str] {
        &["table", "json"]
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "Unknown format: {}. Valid options are: {:?}",
                s,
                Self::names()
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Available commands for the blockcheck CLI.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run HTTP, DNS and traceroute probes for every URL in the input files
    ///
    /// Each file is one batch, named after the file stem. Lines are URLs,
    /// optionally followed by comma separated metadata.
    #[command(alias = "b")]
    Baseline {
        /// Input files (URL lists or CSV)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write the JSON report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of targets probed at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Timeout in seconds for each HTTP or DNS probe
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Limit traceroute to UDP even when running as root
        #[arg(long)]
        unprivileged: bool,

        /// Traceroute methods to run (icmp, udp, tcp); defaults to all available
        #[arg(long = "method", value_delimiter = ',')]
        methods: Vec<TracerouteMethod>,
    },

    /// Check whether a host is blocked, and whether at the DNS or content level
    ///
    /// Fetches the page from every address the system resolver returns and
    /// looks for the marker text; falls back to alternate resolvers.
    #[command(alias = "c")]
    Classify {
        /// Host to check
        #[arg(long)]
        host: Option<String>,

        /// Path to fetch over HTTPS
        #[arg(long)]
        path: Option<String>,

        /// Text expected in the genuine page
        #[arg(long)]
        marker: Option<String>,

        /// Alternate DNS servers (format: IP#Name)
        #[arg(long = "dns")]
        dns_servers: Vec<String>,
    },

    /// Show how an input line is normalized
    #[command(alias = "n")]
    Normalize {
        /// Raw input line, e.g. "example.com/path,metadata"
        line: String,
    },
}

/// Parse CLI arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
