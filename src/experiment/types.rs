//! Experiment result records.
//!
//! Per-target results, the per-batch aggregate, and the blocking verdict.
//! All maps are ordered so that equal inputs serialize identically.

use crate::probe::types::{
    DnsObservation, HttpObservation, ProbeOutcome, TracerouteMethod, TracerouteObservation,
};
use crate::target::TargetDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// A named list of raw input lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputBatch {
    /// Batch name (e.g. "country", "world")
    pub name: String,
    /// Raw lines, each a URL optionally followed by `,metadata`
    pub lines: Vec<String>,
}

impl InputBatch {
    /// Create a batch from any iterator of lines.
    pub fn new<I, S>(name: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

/// All probe outcomes for one target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetResult {
    /// The normalized target
    pub target: TargetDescriptor,
    /// HTTP fetch outcome
    pub http: ProbeOutcome<HttpObservation>,
    /// DNS lookup outcome
    pub dns: ProbeOutcome<DnsObservation>,
    /// One outcome per configured traceroute method
    pub traceroutes: BTreeMap<TracerouteMethod, ProbeOutcome<TracerouteObservation>>,
}

impl TargetResult {
    /// A result where every configured probe failed for the same reason.
    #[must_use]
    pub fn failed(target: TargetDescriptor, methods: &[TracerouteMethod], reason: &str) -> Self {
        Self {
            target,
            http: ProbeOutcome::failed(reason),
            dns: ProbeOutcome::failed(reason),
            traceroutes: methods
                .iter()
                .map(|&method| (method, ProbeOutcome::failed(reason)))
                .collect(),
        }
    }

    /// Number of probes that failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        usize::from(self.http.is_failed())
            + usize::from(self.dns.is_failed())
            + self.traceroutes.values().filter(|o| o.is_failed()).count()
    }
}

/// Aggregated results for one input batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BatchResult {
    /// Name of the input batch
    pub batch_name: String,
    /// HTTP outcomes keyed by target string
    pub http: BTreeMap<String, ProbeOutcome<HttpObservation>>,
    /// DNS outcomes keyed by domain
    pub dns: BTreeMap<String, ProbeOutcome<DnsObservation>>,
    /// Traceroute outcome keyed by domain (last method wins)
    pub traceroute: BTreeMap<String, ProbeOutcome<TracerouteObservation>>,
    /// Every traceroute outcome keyed by domain and method
    pub traceroute_by_method:
        BTreeMap<String, BTreeMap<TracerouteMethod, ProbeOutcome<TracerouteObservation>>>,
    /// Metadata keyed by target string
    pub metadata: BTreeMap<String, String>,
    /// Domain key of each target string
    pub domains: BTreeMap<String, String>,
}

impl BatchResult {
    /// Domain under which the DNS and traceroute outcomes of `target` are kept.
    #[must_use]
    pub fn domain_of(&self, target: &str) -> Option<&str> {
        self.domains.get(target).map(String::as_str)
    }

    /// Number of targets recorded.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.metadata.len()
    }

    /// Count failed HTTP, DNS and traceroute outcomes.
    #[must_use]
    pub fn failure_counts(&self) -> (usize, usize, usize) {
        (
            self.http.values().filter(|o| o.is_failed()).count(),
            self.dns.values().filter(|o| o.is_failed()).count(),
            self.traceroute_by_method
                .values()
                .flat_map(BTreeMap::values)
                .filter(|o| o.is_failed())
                .count(),
        )
    }
}

/// Report of one experiment run over all batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Experiment name
    pub experiment: String,
    /// Start of the run
    pub started_at: DateTime<Utc>,
    /// End of the run
    pub finished_at: DateTime<Utc>,
    /// Traceroute methods used for every target
    pub traceroute_methods: Vec<TracerouteMethod>,
    /// One result per input batch, in input order
    pub batches: Vec<BatchResult>,
}

/// How a target is interfered with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The default resolver leads to the genuine content
    NotBlocked,
    /// Only an alternate resolver leads to the genuine content
    DnsBlocked,
    /// No resolver leads to the genuine content
    ContentBlocked,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotBlocked => write!(f, "not_blocked"),
            Self::DnsBlocked => write!(f, "dns_blocked"),
            Self::ContentBlocked => write!(f, "content_blocked"),
        }
    }
}

/// One address check made while classifying.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Evidence {
    /// Resolver that produced the address
    pub resolver: String,
    /// Address fetched (None when resolution itself failed)
    pub address: Option<IpAddr>,
    /// Whether the marker was missing
    pub blocked: bool,
    /// HTTP status, when a response arrived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Start of the response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Failure reason for resolution or fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Result of one blocking classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockingVerdict {
    /// Host that was checked
    pub target_host: String,
    /// Resolver whose answers decided the verdict
    pub resolver_used: String,
    /// The verdict
    pub classification: Classification,
    /// Every address check, in the order made
    pub evidence: Vec<Evidence>,
}

impl BlockingVerdict {
    /// Short human-readable status line.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.classification {
            Classification::NotBlocked => "No censorship".to_string(),
            Classification::DnsBlocked => {
                format!("DNS blocking, use {}", self.resolver_used)
            }
            Classification::ContentBlocked => {
                "Content blocking, changing resolver does not help".to_string()
            }
        }
    }
}
