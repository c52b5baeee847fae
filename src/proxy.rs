//! Backend proxying for resources that forward to another HTTP server.
//!
//! A backend resource mounted at `/api` with backend `localhost:8080/v1`
//! forwards `/api/users?page=2` to `http://localhost:8080/v1/users?page=2`.
//! `Location` headers in backend responses are mapped back under the proxy
//! path, so redirects keep working for the client.

use std::io::Read;

use url::{Position, Url};

use crate::error::{ResourceError, Result};
use crate::log;
use crate::middleware::{Reply, ResourceRequest};
use crate::utils::path::{is_url, strip_segment_prefix};

/// Response headers managed by the serving layer, never copied from the backend.
const HOP_BY_HOP: &[&str] = &["connection", "transfer-encoding", "content-length", "keep-alive"];

// ============================================================================
// Backend
// ============================================================================

/// Parsed backend address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    raw: String,
    scheme: String,
    host: String,
    port: u16,
    /// Path prefix on the backend, without trailing slash (`""` for root).
    path: String,
}

impl Backend {
    /// Parse `host[:port][/path]`, with `http://` assumed when no scheme is given.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || ResourceError::invalid(format!("Invalid proxy backend '{raw}'"));
        let with_scheme = if is_url(raw) {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };
        let url = Url::parse(&with_scheme).map_err(|_| invalid())?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(invalid)?;

        Ok(Self {
            raw: raw.to_string(),
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port: url.port_or_known_default().unwrap_or(80),
            path: url.path().trim_end_matches('/').to_string(),
        })
    }

    /// The backend as configured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn origin(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    fn is_same_origin(&self, url: &Url) -> bool {
        url.host_str() == Some(self.host.as_str())
            && url.port_or_known_default().unwrap_or(80) == self.port
    }
}

// ============================================================================
// Proxy
// ============================================================================

/// A backend bound to the path it is served under.
#[derive(Debug, Clone)]
pub struct Proxy {
    backend: Backend,
    proxy_path: String,
}

impl Proxy {
    pub fn new(backend: Backend, proxy_path: &str) -> Self {
        Self {
            backend,
            proxy_path: proxy_path.trim_end_matches('/').to_string(),
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Path and query to request from the backend for a client `url`.
    pub fn forward_path(&self, url: &str) -> String {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };
        let rest = strip_segment_prefix(path, &self.proxy_path).unwrap_or(path);
        let mut forward = format!("{}{}", self.backend.path, rest);
        if forward.is_empty() {
            forward.push('/');
        }
        if let Some(query) = query {
            forward.push('?');
            forward.push_str(query);
        }
        forward
    }

    /// Map a backend `Location` header to the client's view of the URL space.
    pub fn rewrite_location(&self, location: &str) -> String {
        let path = match Url::parse(location) {
            Ok(url) if self.backend.is_same_origin(&url) => url[Position::BeforePath..].to_string(),
            Ok(_) => return location.to_string(),
            Err(_) => location.to_string(),
        };
        if !path.starts_with('/') {
            return path;
        }
        let rest = strip_segment_prefix(&path, &self.backend.path).unwrap_or(&path);
        let rest = if rest.is_empty() { "/" } else { rest };
        format!("{}{}", self.proxy_path, rest)
    }

    /// Forward `request` to the backend.
    ///
    /// Unreachable backends answer 503; backend error statuses are passed
    /// through unchanged.
    pub async fn respond(&self, request: &ResourceRequest) -> Reply {
        let proxy = self.clone();
        let request = request.clone();
        match tokio::task::spawn_blocking(move || proxy.forward(&request)).await {
            Ok(reply) => reply,
            Err(e) => Reply::error(503, "PROXY", &format!("proxy task failed: {e}")),
        }
    }

    fn forward(&self, request: &ResourceRequest) -> Reply {
        let target = format!("{}{}", self.backend.origin(), self.forward_path(&request.url));
        let agent = ureq::AgentBuilder::new().redirects(0).build();
        let mut call = agent.request(&request.method, &target);
        for (name, value) in &request.headers {
            if name.eq_ignore_ascii_case("host") || name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            call = call.set(name, value);
        }

        let result = if request.body.is_empty() {
            call.call()
        } else {
            call.send_bytes(&request.body)
        };
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                log!("proxy"; "{} unreachable: {}", self.backend.as_str(), transport);
                return Reply::error(
                    503,
                    "PROXY",
                    &format!("backend {} is unavailable", self.backend.as_str()),
                );
            }
        };

        let status = response.status();
        let mut headers = Vec::new();
        for name in response.headers_names() {
            if HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h)) {
                continue;
            }
            for value in response.all(&name) {
                let value = if name.eq_ignore_ascii_case("location") {
                    self.rewrite_location(value)
                } else {
                    value.to_string()
                };
                headers.push((name.clone(), value));
            }
        }

        let mut body = Vec::new();
        if let Err(e) = response.into_reader().read_to_end(&mut body) {
            log!("proxy"; "failed reading response from {}: {}", target, e);
            return Reply::error(503, "PROXY", &format!("backend response failed: {e}"));
        }
        Reply {
            status,
            headers,
            body,
        }
    }
}
