//! Per-target prober.
//!
//! Runs the HTTP, DNS and traceroute probes for one target and collects
//! every outcome, failed or not, into a [`TargetResult`].

use crate::error::{Error, Result};
use crate::experiment::types::TargetResult;
use crate::probe::adapters::{DnsResolver, HttpFetcher, HttpRequest, Tracer};
use crate::probe::types::{
    DnsObservation, HttpObservation, ProbeOutcome, TracerouteMethod, TracerouteObservation,
};
use crate::target::TargetDescriptor;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Upper bound for each probe kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    /// One HTTP fetch
    pub http: Duration,
    /// One DNS lookup
    pub dns: Duration,
    /// One traceroute run
    pub traceroute: Duration,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            http: Duration::from_secs(30),
            dns: Duration::from_secs(30),
            traceroute: Duration::from_secs(120),
        }
    }
}

/// Run a probe under a time limit and wrap its result.
async fn bounded<T>(limit: Duration, probe: impl Future<Output = Result<T>>) -> ProbeOutcome<T> {
    match tokio::time::timeout(limit, probe).await {
        Ok(result) => ProbeOutcome::from_result(result),
        Err(_) => ProbeOutcome::from_result(Err(Error::Timeout(limit))),
    }
}

/// Runs every configured probe against one target.
///
/// Each probe is attempted exactly once. A failure is recorded in the
/// result and never stops the other probes.
pub struct TargetProber {
    http: Arc<dyn HttpFetcher>,
    dns: Arc<dyn DnsResolver>,
    tracer: Arc<dyn Tracer>,
    methods: Arc<[TracerouteMethod]>,
    timeouts: ProbeTimeouts,
}

impl TargetProber {
    /// Create a prober over the given adapters.
    ///
    /// `methods` is fixed for the lifetime of the prober.
    pub fn new(
        http: Arc<dyn HttpFetcher>,
        dns: Arc<dyn DnsResolver>,
        tracer: Arc<dyn Tracer>,
        methods: Vec<TracerouteMethod>,
        timeouts: ProbeTimeouts,
    ) -> Self {
        Self {
            http,
            dns,
            tracer,
            methods: methods.into(),
            timeouts,
        }
    }

    /// Traceroute methods run for every target.
    #[must_use]
    pub fn methods(&self) -> &[TracerouteMethod] {
        &self.methods
    }

    /// Probe one target.
    ///
    /// The probe kinds are independent (traceroute targets the domain
    /// name, not a resolved address) and run concurrently. The result is
    /// returned only once all of them have finished.
    pub async fn probe(&self, target: TargetDescriptor) -> TargetResult {
        let (http, dns, traceroutes) = tokio::join!(
            self.probe_http(&target),
            self.probe_dns(&target),
            self.probe_traceroutes(&target),
        );

        TargetResult {
            target,
            http,
            dns,
            traceroutes,
        }
    }

    async fn probe_http(&self, target: &TargetDescriptor) -> ProbeOutcome<HttpObservation> {
        info!("{}: HTTP", target.target);
        let request = HttpRequest::new(&target.host, &target.path, target.scheme_is_tls);

        let outcome = bounded(self.timeouts.http, self.http.fetch(&request)).await;
        if let Some(reason) = outcome.failure_reason() {
            info!("{}: HTTP test failed: {reason}", target.target);
        }
        outcome
    }

    async fn probe_dns(&self, target: &TargetDescriptor) -> ProbeOutcome<DnsObservation> {
        let domain = &target.host_no_port;
        info!("{domain}: DNS");

        let outcome = bounded(self.timeouts.dns, self.dns.resolve(domain, None)).await;
        if let Some(reason) = outcome.failure_reason() {
            info!("{domain}: DNS lookup failed: {reason}");
        }
        outcome
    }

    async fn probe_traceroutes(
        &self,
        target: &TargetDescriptor,
    ) -> BTreeMap<TracerouteMethod, ProbeOutcome<TracerouteObservation>> {
        let domain = target.host_no_port.as_str();

        let runs = self.methods.iter().map(|&method| async move {
            let label = method.as_str().to_uppercase();
            info!("{domain}: Traceroute ({label})");

            let outcome = bounded(
                self.timeouts.traceroute,
                self.tracer.traceroute(domain, method),
            )
            .await;
            if let Some(reason) = outcome.failure_reason() {
                info!("{domain}: Traceroute ({label}) failed: {reason}");
            }
            (method, outcome)
        });

        join_all(runs).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::mock::{MockFetcher, MockResolver, MockTracer};
    use crate::target::normalize_line;
    use std::sync::atomic::Ordering;

    fn build_prober(
        fetcher: MockFetcher,
        resolver: MockResolver,
        tracer: Arc<MockTracer>,
        privileged: bool,
    ) -> TargetProber {
        TargetProber::new(
            Arc::new(fetcher),
            Arc::new(resolver),
            tracer,
            TracerouteMethod::available(privileged),
            ProbeTimeouts::default(),
        )
    }

    #[tokio::test]
    async fn test_all_probes_succeed() {
        let tracer = Arc::new(MockTracer::new());
        let prober = build_prober(
            MockFetcher::new().with_body("example.com", "hello"),
            MockResolver::new().with_answer("system", &["93.184.216.34"]),
            tracer.clone(),
            true,
        );

        let result = prober.probe(normalize_line("http://example.com/")).await;

        assert!(result.http.is_ok());
        assert!(result.dns.is_ok());
        assert_eq!(result.traceroutes.len(), 3);
        assert!(result.traceroutes.values().all(ProbeOutcome::is_ok));
        assert_eq!(result.failure_count(), 0);
        assert_eq!(tracer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_http_failure_does_not_stop_other_probes() {
        let prober = build_prober(
            MockFetcher::new(),
            MockResolver::new().with_answer("system", &["93.184.216.34"]),
            Arc::new(MockTracer::new()),
            false,
        );

        let result = prober.probe(normalize_line("example.com/x")).await;

        assert!(result.http.is_failed());
        assert!(result
            .http
            .failure_reason()
            .is_some_and(|r| r.contains("connection refused")));
        assert!(result.dns.is_ok());
        assert_eq!(result.traceroutes.len(), 1);
        assert!(result.traceroutes[&TracerouteMethod::Udp].is_ok());
    }

    #[tokio::test]
    async fn test_one_traceroute_failure_keeps_other_methods() {
        let tracer = Arc::new(MockTracer::new().failing(TracerouteMethod::Icmp));
        let prober = build_prober(
            MockFetcher::new().with_body("example.com", "hello"),
            MockResolver::new(),
            tracer.clone(),
            true,
        );

        let result = prober.probe(normalize_line("example.com")).await;

        assert!(result.dns.is_failed());
        assert!(result.traceroutes[&TracerouteMethod::Icmp].is_failed());
        assert!(result.traceroutes[&TracerouteMethod::Udp].is_ok());
        assert!(result.traceroutes[&TracerouteMethod::Tcp].is_ok());
        assert_eq!(tracer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_probes_use_normalized_fields() {
        let fetcher = Arc::new(MockFetcher::new().with_body("example.com:8443", "ok"));
        let prober = TargetProber::new(
            fetcher.clone(),
            Arc::new(MockResolver::new().with_answer("system", &["93.184.216.34"])),
            Arc::new(MockTracer::new()),
            TracerouteMethod::available(false),
            ProbeTimeouts::default(),
        );

        let result = prober
            .probe(normalize_line("https://example.com:8443/login,finance"))
            .await;

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].netloc, "example.com:8443");
        assert_eq!(requests[0].path, "/login");
        assert!(requests[0].tls);
        assert_eq!(
            result.dns.observation().map(|d| d.domain.as_str()),
            Some("example.com")
        );
    }

    #[tokio::test]
    async fn test_slow_probe_times_out() {
        let prober = TargetProber::new(
            Arc::new(
                MockFetcher::new()
                    .with_body("example.com", "late")
                    .with_delay(Duration::from_secs(60)),
            ),
            Arc::new(MockResolver::new().with_answer("system", &["93.184.216.34"])),
            Arc::new(MockTracer::new()),
            TracerouteMethod::available(false),
            ProbeTimeouts {
                http: Duration::from_millis(100),
                ..ProbeTimeouts::default()
            },
        );

        let result = prober.probe(normalize_line("example.com")).await;

        assert_eq!(result.http.failure_reason(), Some("timed out after 0.1s"));
        assert!(result.dns.is_ok());
    }
}
