//! Blocking classification.
//!
//! Decides whether a host is censored, and at which layer, by comparing
//! the content reached through different resolvers:
//!
//! 1. Resolve through the system resolver and fetch the page from every
//!    returned address. An address is blocked when the marker text is
//!    missing from the body or the fetch fails.
//! 2. Any unblocked address means the host is not blocked.
//! 3. Otherwise try each alternate resolver in turn. The first one that
//!    yields an unblocked address shows DNS-level blocking.
//! 4. If every address from every resolver is blocked, the interference
//!    happens past DNS (on the path or at the content layer).

#![allow(clippy::missing_errors_doc)]

use crate::config::BlockingSettings;
use crate::error::{Error, Result};
use crate::experiment::types::{BlockingVerdict, Classification, Evidence};
use crate::probe::adapters::{DnsResolver, HttpFetcher, HttpRequest};
use crate::probe::types::{DnsServer, SYSTEM_RESOLVER};
use futures::future::join_all;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Characters of the response body kept as evidence.
const SNIPPET_CHARS: usize = 200;

/// Blocking classifier.
///
/// # Example
///
/// ```ignore
/// let classifier = BlockingClassifier::new(http, dns, BlockingSettings::default(), timeout);
/// let verdict = classifier.classify().await?;
/// println!("{}", verdict.summary());
/// ```
pub struct BlockingClassifier {
    http: Arc<dyn HttpFetcher>,
    dns: Arc<dyn DnsResolver>,
    settings: BlockingSettings,
    timeout: Duration,
}

impl BlockingClassifier {
    /// Create a classifier.
    pub fn new(
        http: Arc<dyn HttpFetcher>,
        dns: Arc<dyn DnsResolver>,
        settings: BlockingSettings,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            dns,
            settings,
            timeout,
        }
    }

    /// Run the classification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no alternate resolver or no marker is
    /// configured. Probe failures are recorded as evidence, not returned.
    pub async fn classify(&self) -> Result<BlockingVerdict> {
        if self.settings.alternate_resolvers.is_empty() {
            return Err(Error::config("no alternate resolvers configured"));
        }
        if self.settings.marker.is_empty() {
            return Err(Error::config("marker text must not be empty"));
        }

        let mut evidence = Vec::new();

        if self.reachable_via(None, &mut evidence).await {
            return Ok(self.verdict(Classification::NotBlocked, SYSTEM_RESOLVER, evidence));
        }

        let mut last_resolver = SYSTEM_RESOLVER;
        for server in &self.settings.alternate_resolvers {
            info!("{}: trying resolver {server}", self.settings.host);
            last_resolver = server.name.as_str();
            if self.reachable_via(Some(server), &mut evidence).await {
                return Ok(self.verdict(Classification::DnsBlocked, &server.name, evidence));
            }
        }

        Ok(self.verdict(Classification::ContentBlocked, last_resolver, evidence))
    }

    fn verdict(
        &self,
        classification: Classification,
        resolver: &str,
        evidence: Vec<Evidence>,
    ) -> BlockingVerdict {
        BlockingVerdict {
            target_host: self.settings.host.clone(),
            resolver_used: resolver.to_string(),
            classification,
            evidence,
        }
    }

    /// Check every address `server` returns; true if any one is unblocked.
    async fn reachable_via(&self, server: Option<&DnsServer>, evidence: &mut Vec<Evidence>) -> bool {
        let label = server.map_or(SYSTEM_RESOLVER, |s| s.name.as_str());
        let host = &self.settings.host;

        let addresses = match tokio::time::timeout(self.timeout, self.dns.resolve(host, server))
            .await
        {
            Ok(Ok(observation)) if !observation.addresses.is_empty() => observation.addresses,
            Ok(Ok(_)) => {
                evidence.push(resolution_failure(label, "no addresses returned"));
                return false;
            }
            Ok(Err(e)) => {
                warn!("{host}: resolution via {label} failed: {e}");
                evidence.push(resolution_failure(label, &e.to_string()));
                return false;
            }
            Err(_) => {
                warn!("{host}: resolution via {label} timed out");
                evidence.push(resolution_failure(
                    label,
                    &Error::Timeout(self.timeout).to_string(),
                ));
                return false;
            }
        };

        let checks = join_all(addresses.into_iter().map(|ip| self.check_address(label, ip))).await;
        let reachable = checks.iter().any(|check| !check.blocked);
        evidence.extend(checks);
        reachable
    }

    /// Fetch the page from one address and look for the marker.
    async fn check_address(&self, resolver: &str, ip: IpAddr) -> Evidence {
        let netloc = match ip {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{v6}]"),
        };
        let request = HttpRequest::new(netloc, &self.settings.path, true)
            .header("Host", &self.settings.host);

        let mut evidence = Evidence {
            resolver: resolver.to_string(),
            address: Some(ip),
            blocked: true,
            status: None,
            snippet: None,
            failure: None,
        };

        match tokio::time::timeout(self.timeout, self.http.fetch(&request)).await {
            Ok(Ok(observation)) => {
                evidence.blocked = !observation.body_contains(&self.settings.marker);
                evidence.status = Some(observation.status);
                evidence.snippet = Some(observation.body.chars().take(SNIPPET_CHARS).collect());
            }
            Ok(Err(e)) => evidence.failure = Some(e.to_string()),
            Err(_) => evidence.failure = Some(Error::Timeout(self.timeout).to_string()),
        }

        debug!(
            "{} via {resolver} at {ip}: blocked={}",
            self.settings.host, evidence.blocked
        );
        evidence
    }
}

fn resolution_failure(resolver: &str, reason: &str) -> Evidence {
    Evidence {
        resolver: resolver.to_string(),
        address: None,
        blocked: true,
        status: None,
        snippet: None,
        failure: Some(reason.to_string()),
    }
}
