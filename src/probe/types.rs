//! Probe types and data structures.
//!
//! This module provides the observation types returned by the probe
//! adapters, the [`ProbeOutcome`] wrapper that isolates failures, and the
//! resolver description shared by DNS probing and blocking detection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Label used for the system default resolver.
pub const SYSTEM_RESOLVER: &str = "system";

/// Outcome of a single probe invocation.
///
/// Exactly one variant is populated. A `Failed` outcome is data, not an
/// error: it is recorded in the result and sibling probes keep running.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeOutcome<T> {
    /// The probe returned an observation
    Ok(T),
    /// The probe failed; the reason is kept for the report
    Failed(String),
}

impl<T> ProbeOutcome<T> {
    /// Wrap an adapter result, keeping the error's display text as reason.
    pub fn from_result<E: fmt::Display>(result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    /// Create a failed outcome.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    /// Check if the probe succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Check if the probe failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Borrow the observation, if any.
    #[must_use]
    pub fn observation(&self) -> Option<&T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    /// Borrow the failure reason, if any.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Failed(reason) => Some(reason),
        }
    }
}

/// DNS server information.
///
/// Represents a named resolver, used for resolver-scoped lookups and as
/// an alternate path in blocking detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DnsServer {
    /// Server name (e.g., "Google Public DNS")
    pub name: String,
    /// IP address of the DNS server
    #[serde(rename = "IP")]
    pub ip: String,
}

impl DnsServer {
    /// Create a new DNS server.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let server = DnsServer::new("Google", "8.8.8.8");
    /// ```
    pub fn new(name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
        }
    }

    /// Parse the IP address string into an `IpAddr`.
    #[must_use]
    pub fn ip_addr(&self) -> Option<IpAddr> {
        self.ip.parse().ok()
    }
}

impl fmt::Display for DnsServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.ip)
    }
}

/// Observation from one HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpObservation {
    /// Requested URL
    pub url: String,
    /// Response status code
    pub status: u16,
    /// Canonical reason phrase, when known
    pub reason: Option<String>,
    /// Response headers (repeated headers are joined with `, `)
    pub headers: BTreeMap<String, String>,
    /// Response body, truncated to the configured maximum
    pub body: String,
}

impl HttpObservation {
    /// Check whether the body contains `marker`.
    #[must_use]
    pub fn body_contains(&self, marker: &str) -> bool {
        self.body.contains(marker)
    }
}

/// Observation from one DNS lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DnsObservation {
    /// Domain that was resolved
    pub domain: String,
    /// Resolver label (`system` for the default resolver)
    pub resolver: String,
    /// Addresses returned
    pub addresses: Vec<IpAddr>,
}

/// Transport used for a traceroute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TracerouteMethod {
    /// ICMP echo probes (needs raw sockets)
    Icmp,
    /// UDP probes
    Udp,
    /// TCP SYN probes (needs raw sockets)
    Tcp,
}

impl TracerouteMethod {
    /// Methods available at the given privilege level.
    ///
    /// Raw-socket methods are only usable when privileged; otherwise
    /// traceroute is limited to UDP.
    #[must_use]
    pub fn available(privileged: bool) -> Vec<Self> {
        if privileged {
            vec![Self::Icmp, Self::Udp, Self::Tcp]
        } else {
            vec![Self::Udp]
        }
    }

    /// Narrow the available methods to the `requested` ones.
    ///
    /// An empty request selects every available method. Requested methods
    /// that need privileges the process lacks are left out with a warning.
    #[must_use]
    pub fn select(requested: &[Self], privileged: bool) -> Vec<Self> {
        let available = Self::available(privileged);
        if requested.is_empty() {
            return available;
        }

        for method in requested.iter().filter(|&m| !available.contains(m)) {
            tracing::warn!("Traceroute ({method}) needs root, skipping it.");
        }
        available
            .into_iter()
            .filter(|method| requested.contains(method))
            .collect()
    }

    /// Lowercase name of the method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Icmp => "icmp",
            Self::Udp => "udp",
            Self::Tcp => "tcp",
        }
    }
}

impl fmt::Display for TracerouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TracerouteMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "icmp" => Ok(Self::Icmp),
            "udp" => Ok(Self::Udp),
            "tcp" => Ok(Self::Tcp),
            _ => Err(format!("Unknown traceroute method: {s}")),
        }
    }
}

/// One hop of a traceroute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TracerouteHop {
    /// TTL the probes were sent with
    pub ttl: u8,
    /// Responding address (None when every probe timed out)
    pub address: Option<IpAddr>,
    /// Round-trip times of the answered probes
    pub rtts_ms: Vec<f64>,
}

/// Observation from one traceroute run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TracerouteObservation {
    /// Domain that was traced
    pub domain: String,
    /// Transport used
    pub method: TracerouteMethod,
    /// Address the tool resolved the domain to
    pub destination: Option<IpAddr>,
    /// Hops in TTL order
    pub hops: Vec<TracerouteHop>,
}

impl TracerouteObservation {
    /// Whether the last hop answered from the destination address.
    #[must_use]
    pub fn reached_destination(&self) -> bool {
        match (self.destination, self.hops.last()) {
            (Some(dest), Some(hop)) => hop.address == Some(dest),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unprivileged_methods_are_udp_only() {
        assert_eq!(TracerouteMethod::available(false), vec![TracerouteMethod::Udp]);
    }

    #[test]
    fn test_privileged_methods() {
        assert_eq!(
            TracerouteMethod::available(true),
            vec![
                TracerouteMethod::Icmp,
                TracerouteMethod::Udp,
                TracerouteMethod::Tcp
            ]
        );
    }

    #[test]
    fn test_select_methods() {
        use TracerouteMethod::{Icmp, Tcp, Udp};

        assert_eq!(TracerouteMethod::select(&[], true), vec![Icmp, Udp, Tcp]);
        assert_eq!(TracerouteMethod::select(&[Tcp, Icmp], true), vec![Icmp, Tcp]);
        assert_eq!(TracerouteMethod::select(&[Icmp, Udp], false), vec![Udp]);
        assert!(TracerouteMethod::select(&[Tcp], false).is_empty());
    }

    #[test]
    fn test_method_parse_display() {
        assert_eq!("ICMP".parse::<TracerouteMethod>(), Ok(TracerouteMethod::Icmp));
        assert_eq!(TracerouteMethod::Tcp.to_string(), "tcp");
        assert!("sctp".parse::<TracerouteMethod>().is_err());
    }

    #[test]
    fn test_probe_outcome_from_result() {
        let ok: ProbeOutcome<u8> = ProbeOutcome::from_result(Ok::<u8, String>(3));
        assert!(ok.is_ok());
        assert_eq!(ok.observation(), Some(&3));
        assert!(ok.failure_reason().is_none());

        let failed: ProbeOutcome<u8> =
            ProbeOutcome::from_result(Err::<u8, _>(crate::error::Error::Timeout(
                std::time::Duration::from_secs(2),
            )));
        assert!(failed.is_failed());
        assert_eq!(failed.failure_reason(), Some("timed out after 2.0s"));
    }

    #[test]
    fn test_probe_outcome_serialization() {
        let failed: ProbeOutcome<u8> = ProbeOutcome::failed("refused");
        let json = serde_json::to_string(&failed).unwrap();
        assert_eq!(json, r#"{"failed":"refused"}"#);
    }

    #[test]
    fn test_dns_server_ip_parse() {
        let server = DnsServer::new("Google", "8.8.8.8");
        assert!(server.ip_addr().is_some_and(|ip| ip.is_ipv4()));
        assert!(DnsServer::new("Bad", "nope").ip_addr().is_none());
        assert_eq!(server.to_string(), "Google (8.8.8.8)");
    }

    #[test]
    fn test_reached_destination() {
        let dest: IpAddr = "93.184.216.34".parse().unwrap();
        let mut observation = TracerouteObservation {
            domain: "example.com".into(),
            method: TracerouteMethod::Udp,
            destination: Some(dest),
            hops: vec![TracerouteHop {
                ttl: 1,
                address: Some("192.168.1.1".parse().unwrap()),
                rtts_ms: vec![0.5],
            }],
        };
        assert!(!observation.reached_destination());

        observation.hops.push(TracerouteHop {
            ttl: 2,
            address: Some(dest),
            rtts_ms: vec![12.0],
        });
        assert!(observation.reached_destination());
    }
}
