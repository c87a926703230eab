//! Probe module.
//!
//! This module provides the network probes used by the experiments:
//! - Capability traits for HTTP, DNS and traceroute
//! - Concrete adapters over `reqwest`, `trust-dns-resolver` and the
//!   system `traceroute` binary
//! - Observation types and the [`ProbeOutcome`] wrapper

pub mod adapters;
pub mod dns;
pub mod http;
pub mod traceroute;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use adapters::{DnsResolver, HttpFetcher, HttpRequest, Tracer};
pub use dns::TrustDnsResolver;
pub use http::ReqwestFetcher;
pub use traceroute::{SystemTracer, TracerouteSettings};
pub use types::*;
