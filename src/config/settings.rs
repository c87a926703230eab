//! Experiment settings.
//!
//! Every field has a default, so a config file only needs the values it
//! changes.

use crate::experiment::prober::ProbeTimeouts;
use crate::probe::http::DEFAULT_USER_AGENT;
use crate::probe::traceroute::TracerouteSettings;
use crate::probe::types::DnsServer;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Host checked by the blocking classifier unless configured otherwise.
pub const DEFAULT_BLOCKING_HOST: &str = "twitter.com";

/// Path fetched by the blocking classifier unless configured otherwise.
pub const DEFAULT_BLOCKING_PATH: &str = "/feamster/status/452889624541921280";

/// Text expected in the genuine page.
pub const DEFAULT_BLOCKING_MARKER: &str = "home network testbed will appear at";

/// Google Public DNS, the default alternate resolver.
const GOOGLE_DNS: &str = "8.8.8.8";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Timeout for one HTTP fetch or DNS lookup, in seconds
    pub probe_timeout_secs: u64,
    /// Timeout for one traceroute run, in seconds
    pub traceroute_timeout_secs: u64,
    /// Number of targets probed at once
    pub concurrency: usize,
    /// Bytes of each response body kept
    pub max_body_bytes: usize,
    /// User agent sent with HTTP probes
    pub user_agent: String,
    /// Traceroute binary settings
    pub traceroute: TracerouteSettings,
    /// Blocking classifier settings
    pub blocking: BlockingSettings,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 30,
            traceroute_timeout_secs: 120,
            concurrency: crate::experiment::baseline::DEFAULT_CONCURRENCY,
            max_body_bytes: 1 << 20,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            traceroute: TracerouteSettings::default(),
            blocking: BlockingSettings::default(),
        }
    }
}

impl ExperimentConfig {
    /// Timeout for HTTP and DNS probes.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Per-probe time limits.
    #[must_use]
    pub fn probe_timeouts(&self) -> ProbeTimeouts {
        ProbeTimeouts {
            http: self.probe_timeout(),
            dns: self.probe_timeout(),
            traceroute: Duration::from_secs(self.traceroute_timeout_secs),
        }
    }
}

/// What the blocking classifier checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BlockingSettings {
    /// Host to resolve and send as `Host`
    pub host: String,
    /// Path to fetch over HTTPS
    pub path: String,
    /// Substring present in the genuine page
    pub marker: String,
    /// Resolvers tried after the system resolver, in order
    pub alternate_resolvers: Vec<DnsServer>,
}

impl Default for BlockingSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_BLOCKING_HOST.to_string(),
            path: DEFAULT_BLOCKING_PATH.to_string(),
            marker: DEFAULT_BLOCKING_MARKER.to_string(),
            alternate_resolvers: vec![DnsServer::new("Google Public DNS", GOOGLE_DNS)],
        }
    }
}
