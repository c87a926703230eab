//! Target normalization.
//!
//! Turns one raw input line (a URL, optionally followed by comma separated
//! metadata) into a [`TargetDescriptor`]. Normalization never fails: input
//! that cannot be parsed yields a degraded descriptor with the reason kept
//! in [`TargetDescriptor::parse_error`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use url::{Host, Url};

/// Canonical description of one measurement target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetDescriptor {
    /// The input line as it was read
    pub raw_input: String,
    /// Target string after metadata split and quote stripping
    pub target: String,
    /// Whether the target uses `https`
    pub scheme_is_tls: bool,
    /// Network location (host with optional `:port`)
    pub host: String,
    /// Host without port, used as the domain for DNS and traceroute
    pub host_no_port: String,
    /// HTTP path, `/` when the input has none
    pub path: String,
    /// Free-text metadata following the first comma
    pub metadata: String,
    /// Reason the target could not be parsed, if it was degraded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl TargetDescriptor {
    /// Whether normalization had to fall back to the raw target string.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.parse_error.is_some()
    }
}

/// Parsed network location of a target.
#[derive(Debug, PartialEq, Eq)]
struct Location {
    tls: bool,
    host: String,
    host_no_port: String,
    path: String,
}

impl Location {
    fn from_url(url: &Url, tls: bool) -> Option<Self> {
        let host_no_port = match url.host()? {
            Host::Domain(domain) if domain.is_empty() => return None,
            Host::Domain(domain) => domain.to_string(),
            Host::Ipv4(addr) => addr.to_string(),
            Host::Ipv6(addr) => addr.to_string(),
        };
        let host_str = url.host_str()?;
        let host = match url.port() {
            Some(port) => format!("{host_str}:{port}"),
            None => host_str.to_string(),
        };
        let path = if url.path().is_empty() {
            "/".to_string()
        } else {
            url.path().to_string()
        };

        Some(Self {
            tls,
            host,
            host_no_port,
            path,
        })
    }
}

/// Normalize one raw input line into a [`TargetDescriptor`].
///
/// # Example
///
/// ```ignore
/// let target = normalize_line("example.com/x,news");
/// assert_eq!(target.host_no_port, "example.com");
/// assert_eq!(target.path, "/x");
/// assert_eq!(target.metadata, "news");
/// ```
#[must_use]
pub fn normalize_line(line: &str) -> TargetDescriptor {
    let (target, metadata) = split_metadata(line.trim());
    let target = strip_quotes(target);

    match parse_location(target) {
        Ok(location) => TargetDescriptor {
            raw_input: line.to_string(),
            target: target.to_string(),
            scheme_is_tls: location.tls,
            host: location.host,
            host_no_port: location.host_no_port,
            path: location.path,
            metadata: metadata.to_string(),
            parse_error: None,
        },
        Err(e) => {
            tracing::warn!("{target}: failed to parse URL: {e}");
            TargetDescriptor {
                raw_input: line.to_string(),
                target: target.to_string(),
                scheme_is_tls: false,
                host: target.to_string(),
                host_no_port: strip_port(target).to_string(),
                path: "/".to_string(),
                metadata: metadata.to_string(),
                parse_error: Some(e.to_string()),
            }
        }
    }
}

/// Split on the first comma only; the metadata part is kept verbatim.
fn split_metadata(line: &str) -> (&str, &str) {
    match line.split_once(',') {
        Some((target, metadata)) => (target.trim(), metadata),
        None => (line, ""),
    }
}

/// Remove one layer of surrounding quotes.
///
/// The closing character is only removed when it matches the opening one,
/// so `"example.com` becomes `example.com` rather than `example.co`.
fn strip_quotes(target: &str) -> &str {
    let Some(quote) = target.chars().next().filter(|c| matches!(c, '"' | '\'')) else {
        return target;
    };
    let inner = &target[quote.len_utf8()..];
    inner.strip_suffix(quote).unwrap_or(inner)
}

/// Parse the network location, retrying in schemeless-authority form.
///
/// Only input without a `scheme://` prefix is retried; a URL that names
/// its scheme and still fails to parse is reported as a failure.
fn parse_location(target: &str) -> Result<Location> {
    let has_authority = has_scheme_prefix(target);

    match Url::parse(target) {
        Ok(url) => {
            if let Some(location) = Location::from_url(&url, url.scheme() == "https") {
                return Ok(location);
            }
            if has_authority {
                return Err(Error::parse("no network location"));
            }
        }
        Err(e) if has_authority => return Err(Error::parse(e.to_string())),
        Err(_) => {}
    }

    // `example.com/path` or `example.com:8080`: no scheme, authority first
    let url = Url::parse(&format!("http://{target}"))
        .map_err(|e| Error::parse(format!("{e}")))?;
    Location::from_url(&url, false).ok_or_else(|| Error::parse("no network location"))
}

/// Whether `target` starts with `scheme://`.
fn has_scheme_prefix(target: &str) -> bool {
    target.split_once("://").is_some_and(|(scheme, _)| {
        scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Drop a trailing `:port`; anything else after the last colon is kept.
fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}
