//! Configuration and input loader.
//!
//! This module provides functionality to load experiment settings from
//! JSON files, resolvers from command-line arguments, and input batches
//! from URL list or CSV files.

use crate::config::settings::ExperimentConfig;
use crate::error::{Error, Result};
use crate::experiment::types::InputBatch;
use crate::probe::types::DnsServer;
use std::path::{Path, PathBuf};

/// File name of the configuration in the config directory.
const CONFIG_FILE: &str = "config.json";

/// Configuration and input loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the experiment configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = ConfigLoader::load_from_file("blockcheck.json")?;
    /// println!("concurrency: {}", config.concurrency);
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<ExperimentConfig> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ExperimentConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load the configuration from the default location.
    ///
    /// Searches in the following order:
    /// 1. `$CONFIG_DIR/blockcheck/config.json`
    /// 2. `blockcheck.json` in the current directory
    ///
    /// Falls back to the built-in defaults when neither file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be read or parsed.
    pub fn load_default() -> Result<ExperimentConfig> {
        let candidates = [
            Self::config_dir().join(CONFIG_FILE),
            PathBuf::from("blockcheck.json"),
        ];

        for path in candidates {
            if path.is_file() {
                tracing::debug!("Loading config from {}", path.display());
                return Self::load_from_file(&path);
            }
        }

        Ok(ExperimentConfig::default())
    }

    /// Get the config directory path.
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("blockcheck")
    }

    /// Create a resolver list from command-line arguments.
    ///
    /// # Arguments
    ///
    /// * `resolvers` - Strings in format "IP#Name" (the name defaults to the IP)
    ///
    /// # Errors
    ///
    /// Returns an error if any IP address is invalid.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let args = vec!["8.8.8.8#Google".to_string(), "1.1.1.1#Cloudflare".to_string()];
    /// let resolvers = ConfigLoader::resolvers_from_args(args)?;
    /// ```
    pub fn resolvers_from_args(resolvers: Vec<String>) -> Result<Vec<DnsServer>> {
        let mut servers = Vec::new();
        for s in resolvers {
            let (ip, name) = match s.split_once('#') {
                Some((ip, name)) => (ip.trim().to_string(), name.trim().to_string()),
                None => (s.trim().to_string(), s.trim().to_string()),
            };

            // Validate IP address
            if ip.parse::<std::net::IpAddr>().is_err() {
                return Err(Error::Parse(format!("Invalid IP address: {ip}")));
            }

            servers.push(DnsServer::new(name, ip));
        }
        Ok(servers)
    }

    /// Load one input batch; the batch is named after the file stem.
    ///
    /// Lines are kept raw. Normalization, including splitting off CSV
    /// metadata, happens when the batch is run.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load_batch<P: AsRef<Path>>(path: P) -> Result<InputBatch> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| Error::config(format!("Not an input file: {}", path.display())))?;
        let content = std::fs::read_to_string(path)?;

        Ok(InputBatch::new(name, content.lines()))
    }

    /// Load several input batches, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be read.
    pub fn load_batches<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<InputBatch>> {
        paths.iter().map(Self::load_batch).collect()
    }
}
