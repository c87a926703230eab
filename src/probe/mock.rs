//! Scripted probe adapters for tests.

use crate::error::{Error, Result};
use crate::probe::adapters::{DnsResolver, HttpFetcher, HttpRequest, Tracer};
use crate::probe::types::{
    DnsObservation, DnsServer, HttpObservation, TracerouteHop, TracerouteMethod,
    TracerouteObservation, SYSTEM_RESOLVER,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// HTTP fetcher answering with a fixed body per netloc.
#[derive(Default)]
pub struct MockFetcher {
    bodies: HashMap<String, String>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests to `netloc` with `body`; unknown netlocs fail.
    pub fn with_body(mut self, netloc: &str, body: &str) -> Self {
        self.bodies.insert(netloc.to_string(), body.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Largest number of fetches that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpFetcher for MockFetcher {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpObservation> {
        self.requests.lock().unwrap().push(request.clone());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let body = self
            .bodies
            .get(&request.netloc)
            .ok_or_else(|| Error::network(format!("connection refused: {}", request.netloc)))?;
        Ok(HttpObservation {
            url: request.url(),
            status: 200,
            reason: Some("OK".to_string()),
            headers: BTreeMap::new(),
            body: body.clone(),
        })
    }
}

/// DNS resolver answering from a table keyed by resolver label.
#[derive(Default)]
pub struct MockResolver {
    answers: HashMap<String, Vec<IpAddr>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer lookups through `resolver` (`system` or a server name).
    pub fn with_answer(mut self, resolver: &str, addresses: &[&str]) -> Self {
        let addresses = addresses.iter().map(|a| a.parse().unwrap()).collect();
        self.answers.insert(resolver.to_string(), addresses);
        self
    }

    pub fn call_count(&self, resolver: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == resolver)
            .count()
    }
}

#[async_trait]
impl DnsResolver for MockResolver {
    async fn resolve(&self, domain: &str, server: Option<&DnsServer>) -> Result<DnsObservation> {
        let label = server.map_or(SYSTEM_RESOLVER, |s| s.name.as_str()).to_string();
        self.calls.lock().unwrap().push(label.clone());
        let addresses = self
            .answers
            .get(&label)
            .cloned()
            .ok_or_else(|| Error::network(format!("SERVFAIL from {label}")))?;
        Ok(DnsObservation {
            domain: domain.to_string(),
            resolver: label,
            addresses,
        })
    }
}

/// Tracer that fails for the configured methods.
#[derive(Default)]
pub struct MockTracer {
    failing: HashSet<TracerouteMethod>,
    pub calls: AtomicUsize,
}

impl MockTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, method: TracerouteMethod) -> Self {
        self.failing.insert(method);
        self
    }
}

#[async_trait]
impl Tracer for MockTracer {
    async fn traceroute(
        &self,
        domain: &str,
        method: TracerouteMethod,
    ) -> Result<TracerouteObservation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&method) {
            return Err(Error::network(format!("{method} probes blocked")));
        }
        Ok(TracerouteObservation {
            domain: domain.to_string(),
            method,
            destination: None,
            hops: vec![TracerouteHop {
                ttl: 1,
                address: Some("192.168.1.1".parse().unwrap()),
                rtts_ms: vec![0.5],
            }],
        })
    }
}
