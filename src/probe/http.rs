//! HTTP probe adapter backed by `reqwest`.
//!
//! Redirects are not followed and system proxies are ignored: a redirect
//! to a block page is itself the observation. Bodies are read chunk by
//! chunk and cut off at the configured limit.
//!
//! A request whose netloc is a literal address and which carries a `Host`
//! header is sent to the named host pinned to that address, so TLS uses
//! the real host name for SNI and certificate checks.

#![allow(clippy::missing_errors_doc)]

use crate::error::Result;
use crate::probe::adapters::{HttpFetcher, HttpRequest};
use crate::probe::types::HttpObservation;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Default user agent sent with probes.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// HTTP fetcher.
///
/// # Example
///
/// ```ignore
/// let fetcher = ReqwestFetcher::new(Duration::from_secs(10), DEFAULT_USER_AGENT, 1 << 20)?;
/// let request = HttpRequest::new("93.184.216.34", "/", true).header("Host", "example.com");
/// let observation = fetcher.fetch(&request).await?;
/// ```
pub struct ReqwestFetcher {
    client: Client,
    timeout: Duration,
    user_agent: String,
    max_body_bytes: usize,
}

impl ReqwestFetcher {
    /// Create a new fetcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn new(timeout: Duration, user_agent: &str, max_body_bytes: usize) -> Result<Self> {
        let client = Self::builder(timeout, user_agent).build()?;

        Ok(Self {
            client,
            timeout,
            user_agent: user_agent.to_string(),
            max_body_bytes,
        })
    }

    fn builder(timeout: Duration, user_agent: &str) -> ClientBuilder {
        Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(Policy::none())
            .no_proxy()
            .gzip(true)
    }

    /// Resolve the URL and client to use for `request`.
    fn plan(&self, request: &HttpRequest) -> Result<(String, Option<Client>)> {
        let (Some(host), Some((ip, port))) =
            (request.host_header(), literal_address(&request.netloc))
        else {
            return Ok((request.url(), None));
        };

        let host_name = host.split(':').next().unwrap_or(host);
        let default_port = if request.tls { 443 } else { 80 };
        let authority = match port {
            Some(port) if port != default_port => format!("{host_name}:{port}"),
            _ => host_name.to_string(),
        };

        let pinned = HttpRequest {
            netloc: authority,
            ..request.clone()
        };
        let client = Self::builder(self.timeout, &self.user_agent)
            .resolve(
                host_name,
                SocketAddr::new(ip, port.unwrap_or(default_port)),
            )
            .build()?;

        Ok((pinned.url(), Some(client)))
    }
}

/// Parse a netloc that is a literal address, with an optional port.
fn literal_address(netloc: &str) -> Option<(IpAddr, Option<u16>)> {
    if let Ok(addr) = netloc.parse::<SocketAddr>() {
        return Some((addr.ip(), Some(addr.port())));
    }
    netloc
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .ok()
        .map(|ip| (ip, None))
}

/// Decode a body prefix of at most `limit` bytes.
fn truncate_body(bytes: &[u8], limit: usize) -> String {
    String::from_utf8_lossy(&bytes[..bytes.len().min(limit)]).into_owned()
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpObservation> {
        let (url, pinned_client) = self.plan(request)?;
        let client = pinned_client.as_ref().unwrap_or(&self.client);

        let mut builder = client.get(&url);
        for (name, value) in &request.headers {
            // The pinned client derives Host from the URL
            if pinned_client.is_some() && name.eq_ignore_ascii_case("host") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder.send().await?;
        let status = response.status();

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() >= self.max_body_bytes {
                tracing::debug!("{url}: body truncated at {} bytes", self.max_body_bytes);
                break;
            }
        }

        Ok(HttpObservation {
            url,
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            headers,
            body: truncate_body(&body, self.max_body_bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response and hand back the raw request text.
    async fn serve_once(body: &'static str) -> (SocketAddr, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nX-Probe: a\r\nX-Probe: b\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });
        (addr, handle)
    }

    #[test]
    fn test_literal_address() {
        assert_eq!(
            literal_address("1.2.3.4:8080"),
            Some(("1.2.3.4".parse().unwrap(), Some(8080)))
        );
        assert_eq!(
            literal_address("1.2.3.4"),
            Some(("1.2.3.4".parse().unwrap(), None))
        );
        assert_eq!(
            literal_address("[2001:db8::1]"),
            Some(("2001:db8::1".parse().unwrap(), None))
        );
        assert_eq!(literal_address("example.com"), None);
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body(b"hello world", 5), "hello");
        assert_eq!(truncate_body(b"hi", 5), "hi");
    }

    #[tokio::test]
    async fn test_fetch_plain_http() {
        let (addr, server) = serve_once("<html>hello</html>").await;
        let fetcher = ReqwestFetcher::new(Duration::from_secs(5), DEFAULT_USER_AGENT, 1024).unwrap();

        let observation = fetcher
            .fetch(&HttpRequest::new(addr.to_string(), "/page", false))
            .await
            .unwrap();

        assert_eq!(observation.status, 200);
        assert_eq!(observation.reason.as_deref(), Some("OK"));
        assert_eq!(observation.body, "<html>hello</html>");
        assert_eq!(observation.headers.get("x-probe").map(String::as_str), Some("a, b"));
        assert!(observation.body_contains("hello"));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /page HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_fetch_pinned_sends_host() {
        let (addr, server) = serve_once("pinned").await;
        let fetcher = ReqwestFetcher::new(Duration::from_secs(5), DEFAULT_USER_AGENT, 1024).unwrap();

        let request =
            HttpRequest::new(addr.to_string(), "/status", false).header("Host", "blocked.test");
        let observation = fetcher.fetch(&request).await.unwrap();

        assert_eq!(observation.url, format!("http://blocked.test:{}/status", addr.port()));
        assert_eq!(observation.body, "pinned");

        let raw = server.await.unwrap().to_lowercase();
        assert!(raw.contains(&format!("host: blocked.test:{}", addr.port())));
    }

    #[tokio::test]
    async fn test_fetch_truncates_body() {
        let (addr, _server) = serve_once("0123456789").await;
        let fetcher = ReqwestFetcher::new(Duration::from_secs(5), DEFAULT_USER_AGENT, 4).unwrap();

        let observation = fetcher
            .fetch(&HttpRequest::new(addr.to_string(), "/", false))
            .await
            .unwrap();
        assert_eq!(observation.body, "0123");
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = ReqwestFetcher::new(Duration::from_secs(2), DEFAULT_USER_AGENT, 1024).unwrap();
        let result = fetcher
            .fetch(&HttpRequest::new(addr.to_string(), "/", false))
            .await;
        assert!(result.is_err());
    }
}
