//! DNS probe adapter backed by `trust-dns-resolver`.
//!
//! Lookups go through the system resolver by default. A lookup scoped to
//! a named [`DnsServer`] gets a dedicated resolver that only talks to that
//! server, so answers from different paths never mix.

#![allow(clippy::missing_errors_doc)]

use crate::error::{Error, Result};
use crate::probe::adapters::DnsResolver;
use crate::probe::types::{DnsObservation, DnsServer, SYSTEM_RESOLVER};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Standard DNS port.
const DNS_PORT: u16 = 53;

/// DNS lookups through the system resolver or a named server.
///
/// # Example
///
/// ```ignore
/// let resolver = TrustDnsResolver::new(Duration::from_secs(5))?;
/// let system = resolver.resolve("example.com", None).await?;
/// let google = resolver
///     .resolve("example.com", Some(&DnsServer::new("Google", "8.8.8.8")))
///     .await?;
/// ```
pub struct TrustDnsResolver {
    system_resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl TrustDnsResolver {
    /// Create a resolver using the system configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the system resolver configuration cannot be read.
    pub fn new(timeout: Duration) -> Result<Self> {
        let (config, mut opts) = trust_dns_resolver::system_conf::read_system_conf()
            .map_err(|e| Error::network(format!("Failed to read system resolver config: {e}")))?;
        Self::tune(&mut opts, timeout);
        let system_resolver = TokioAsyncResolver::tokio(config, opts).map_err(Error::Resolver)?;

        Ok(Self {
            system_resolver,
            timeout,
        })
    }

    /// One attempt per query; the prober decides on retries.
    fn tune(opts: &mut ResolverOpts, timeout: Duration) {
        opts.timeout = timeout;
        opts.attempts = 1;
    }

    /// Build a resolver that only queries `server`.
    fn scoped_resolver(&self, server: &DnsServer) -> Result<TokioAsyncResolver> {
        let ip = server
            .ip_addr()
            .ok_or_else(|| Error::config(format!("Invalid resolver address: {}", server.ip)))?;

        let config = ResolverConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(&[ip], DNS_PORT, true),
        );
        let mut opts = ResolverOpts::default();
        Self::tune(&mut opts, self.timeout);

        TokioAsyncResolver::tokio(config, opts).map_err(Error::Resolver)
    }
}

/// Make a domain fully qualified so search domains are not appended.
fn fully_qualified(domain: &str) -> String {
    if domain.parse::<IpAddr>().is_ok() || domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{domain}.")
    }
}

async fn lookup(resolver: &TokioAsyncResolver, domain: &str) -> Result<Vec<IpAddr>> {
    let response = resolver.lookup_ip(fully_qualified(domain)).await?;
    Ok(response.iter().collect())
}

#[async_trait]
impl DnsResolver for TrustDnsResolver {
    async fn resolve(&self, domain: &str, server: Option<&DnsServer>) -> Result<DnsObservation> {
        let (resolver_label, addresses) = match server {
            Some(server) => {
                let resolver = self.scoped_resolver(server)?;
                (server.name.clone(), lookup(&resolver, domain).await?)
            }
            None => (
                SYSTEM_RESOLVER.to_string(),
                lookup(&self.system_resolver, domain).await?,
            ),
        };

        tracing::debug!("{domain} via {resolver_label}: {addresses:?}");

        Ok(DnsObservation {
            domain: domain.trim_end_matches('.').to_string(),
            resolver: resolver_label,
            addresses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_qualified() {
        assert_eq!(fully_qualified("example.com"), "example.com.");
        assert_eq!(fully_qualified("example.com."), "example.com.");
        assert_eq!(fully_qualified("93.184.216.34"), "93.184.216.34");
        assert_eq!(fully_qualified("2001:db8::1"), "2001:db8::1");
    }

    #[tokio::test]
    async fn test_scoped_resolver_rejects_bad_address() {
        let Ok(resolver) = TrustDnsResolver::new(Duration::from_secs(2)) else {
            return;
        };
        let err = resolver
            .resolve("example.com", Some(&DnsServer::new("Broken", "not-an-ip")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_resolve_public_domain() {
        // This test requires network connection which may be unreliable in CI
        if std::env::var("CI").is_ok() {
            return;
        }

        let Ok(resolver) = TrustDnsResolver::new(Duration::from_secs(5)) else {
            return;
        };
        if let Ok(observation) = resolver
            .resolve("example.com", Some(&DnsServer::new("Google", "8.8.8.8")))
            .await
        {
            assert_eq!(observation.domain, "example.com");
            assert_eq!(observation.resolver, "Google");
            println!("Addresses: {:?}", observation.addresses);
        }
    }
}
