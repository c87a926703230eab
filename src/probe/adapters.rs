//! Probe capability traits.
//!
//! The experiment code only talks to the network through these traits.
//! Each call performs exactly one attempt and reports failure as an
//! [`Error`](crate::error::Error); retry policy belongs to the caller.

use crate::error::Result;
use crate::probe::types::{
    DnsObservation, DnsServer, HttpObservation, TracerouteMethod, TracerouteObservation,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// One HTTP request to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Network location (`host[:port]`, or a literal address)
    pub netloc: String,
    /// Request path
    pub path: String,
    /// Use HTTPS instead of HTTP
    pub tls: bool,
    /// Extra request headers
    pub headers: BTreeMap<String, String>,
}

impl HttpRequest {
    /// Create a GET request for `netloc` and `path`.
    pub fn new(netloc: impl Into<String>, path: impl Into<String>, tls: bool) -> Self {
        Self {
            netloc: netloc.into(),
            path: path.into(),
            tls,
            headers: BTreeMap::new(),
        }
    }

    /// Add a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Value of the `Host` header, if one was set (case-insensitive).
    #[must_use]
    pub fn host_header(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("host"))
            .map(|(_, value)| value.as_str())
    }

    /// Full URL for the request.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("{scheme}://{}{path}", self.netloc)
    }
}

/// Performs HTTP(S) requests.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Perform one request and return the observed response.
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpObservation>;
}

/// Performs DNS lookups.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// Resolve `domain`, using `server` instead of the system resolver when given.
    async fn resolve(&self, domain: &str, server: Option<&DnsServer>) -> Result<DnsObservation>;
}

/// Performs path traces.
#[async_trait]
pub trait Tracer: Send + Sync {
    /// Trace the path to `domain` using `method`.
    async fn traceroute(
        &self,
        domain: &str,
        method: TracerouteMethod,
    ) -> Result<TracerouteObservation>;
}
