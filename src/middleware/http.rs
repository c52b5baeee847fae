//! Transport-neutral request and reply types.
//!
//! The middleware never touches sockets: a server converts its native
//! request into a [`ResourceRequest`] and writes the [`Reply`] back.

use crate::utils::mime::types::JSON;

/// An incoming HTTP request.
#[derive(Debug, Clone, Default)]
pub struct ResourceRequest {
    pub method: String,
    /// Path plus optional query, as sent by the client.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ResourceRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_head(&self) -> bool {
        self.method.eq_ignore_ascii_case("HEAD")
    }

    /// URL path without the query string.
    pub fn path(&self) -> &str {
        self.url.split(['?', '#']).next().unwrap_or_default()
    }
}

/// A complete HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// JSON error reply: `{"code": .., "message": ..}`.
    pub fn error(status: u16, code: &str, message: &str) -> Self {
        let body = serde_json::json!({ "code": code, "message": message }).to_string();
        Self {
            status,
            headers: vec![(
                "Content-Type".to_string(),
                format!("{JSON}; charset=utf-8"),
            )],
            body: body.into_bytes(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_path_and_headers() {
        let request = ResourceRequest::get("/app/foo.js?v=1").with_header("Accept", "text/html");
        assert_eq!(request.path(), "/app/foo.js");
        assert_eq!(request.header("accept"), Some("text/html"));
        assert!(!request.is_head());
        assert!(ResourceRequest::new("head", "/").is_head());
    }

    #[test]
    fn test_error_reply() {
        let reply = Reply::error(500, "CONTENT", "Oh noes");
        assert_eq!(reply.status, 500);
        assert_eq!(reply.header("content-type"), Some("application/json; charset=utf-8"));
        let body: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(body["code"], "CONTENT");
        assert_eq!(body["message"], "Oh noes");
    }
}
