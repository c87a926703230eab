//! Traceroute probe adapter running the system `traceroute` binary.
//!
//! Output is requested in numeric form (`-n`) and parsed into hops. The
//! child is killed if the probe future is dropped, so an enforced timeout
//! in the caller also stops the process.

#![allow(clippy::missing_errors_doc)]

use crate::error::{Error, Result};
use crate::probe::adapters::Tracer;
use crate::probe::types::{TracerouteHop, TracerouteMethod, TracerouteObservation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::process::Stdio;
use tokio::process::Command;

/// Settings for the traceroute binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TracerouteSettings {
    /// Binary to execute
    pub binary: String,
    /// Maximum TTL (`-m`)
    pub max_hops: u8,
    /// Seconds to wait for each probe (`-w`)
    pub wait_secs: u64,
    /// Probes per hop (`-q`)
    pub queries: u8,
}

impl Default for TracerouteSettings {
    fn default() -> Self {
        Self {
            binary: "traceroute".to_string(),
            max_hops: 30,
            wait_secs: 2,
            queries: 3,
        }
    }
}

/// Tracer backed by the system `traceroute` command.
pub struct SystemTracer {
    settings: TracerouteSettings,
}

impl SystemTracer {
    /// Create a new tracer.
    #[must_use]
    pub fn new(settings: TracerouteSettings) -> Self {
        Self { settings }
    }

    fn args(&self, domain: &str, method: TracerouteMethod) -> Vec<String> {
        let mut args = vec![
            "-n".to_string(),
            "-m".to_string(),
            self.settings.max_hops.to_string(),
            "-w".to_string(),
            self.settings.wait_secs.to_string(),
            "-q".to_string(),
            self.settings.queries.to_string(),
        ];
        match method {
            TracerouteMethod::Icmp => args.push("-I".to_string()),
            TracerouteMethod::Tcp => args.push("-T".to_string()),
            // UDP is the default probe type
            TracerouteMethod::Udp => {}
        }
        args.push(domain.to_string());
        args
    }
}

#[async_trait]
impl Tracer for SystemTracer {
    async fn traceroute(
        &self,
        domain: &str,
        method: TracerouteMethod,
    ) -> Result<TracerouteObservation> {
        let args = self.args(domain, method);
        tracing::debug!("{} {}", self.settings.binary, args.join(" "));

        let output = Command::new(&self.settings.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::network(format!(
                "{} exited with {}: {}",
                self.settings.binary,
                output.status,
                stderr.trim()
            )));
        }

        parse_output(domain, method, &String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse numeric `traceroute` output.
///
/// ```text
/// traceroute to example.com (93.184.216.34), 30 hops max, 60 byte packets
///  1  192.168.1.1  0.512 ms  0.480 ms  0.455 ms
///  2  * * *
///  3  93.184.216.34  11.2 ms *  10.9 ms
/// ```
pub fn parse_output(
    domain: &str,
    method: TracerouteMethod,
    output: &str,
) -> Result<TracerouteObservation> {
    let mut destination = None;
    let mut hops = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.starts_with("traceroute") {
            destination = line
                .split_once('(')
                .and_then(|(_, rest)| rest.split_once(')'))
                .and_then(|(addr, _)| addr.parse::<IpAddr>().ok());
            continue;
        }
        if let Some(hop) = parse_hop(line) {
            hops.push(hop);
        }
    }

    if hops.is_empty() {
        return Err(Error::parse(format!("no hops in traceroute output for {domain}")));
    }

    Ok(TracerouteObservation {
        domain: domain.to_string(),
        method,
        destination,
        hops,
    })
}

fn parse_hop(line: &str) -> Option<TracerouteHop> {
    let mut tokens = line.split_whitespace().peekable();
    let ttl = tokens.next()?.parse::<u8>().ok()?;

    let mut address = None;
    let mut rtts_ms = Vec::new();
    while let Some(token) = tokens.next() {
        if let Ok(ip) = token.parse::<IpAddr>() {
            // Several routers may answer for one TTL; keep the first
            address.get_or_insert(ip);
        } else if let Ok(rtt) = token.parse::<f64>() {
            if tokens.peek() == Some(&"ms") {
                tokens.next();
                rtts_ms.push(rtt);
            }
        }
    }

    Some(TracerouteHop {
        ttl,
        address,
        rtts_ms,
    })
}
