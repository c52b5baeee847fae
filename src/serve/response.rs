//! Conversion between tiny_http and middleware types.

use anyhow::{Context, Result};
use std::io::Read;
use tiny_http::{Header, Request, Response, StatusCode};

use crate::debug;
use crate::middleware::{Reply, ResourceRequest};
use crate::utils::mime::types::PLAIN;

/// Headers tiny_http computes itself.
const MANAGED_HEADERS: &[&str] = &["content-length", "transfer-encoding", "connection"];

/// Read method, url, headers and body of `request`.
pub fn to_resource_request(request: &mut Request) -> Result<ResourceRequest> {
    let mut body = Vec::new();
    request
        .as_reader()
        .read_to_end(&mut body)
        .context("Failed to read request body")?;

    let headers = request
        .headers()
        .iter()
        .map(|h| (h.field.as_str().as_str().to_string(), h.value.to_string()))
        .collect();

    Ok(ResourceRequest {
        method: request.method().as_str().to_string(),
        url: request.url().to_string(),
        headers,
        body,
    })
}

/// Write a middleware reply.
pub fn send_reply(request: Request, reply: Reply) -> Result<()> {
    let mut response = Response::from_data(reply.body).with_status_code(StatusCode(reply.status));
    for (name, value) in &reply.headers {
        if MANAGED_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h)) {
            continue;
        }
        match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => response.add_header(header),
            Err(()) => debug!("serve"; "dropping invalid header {}", name),
        }
    }
    request.respond(response)?;
    Ok(())
}

/// Plain-text reply for requests outside the middleware's context path.
pub fn respond_not_found(request: Request) -> Result<()> {
    send_plain(request, 404, "404 Not Found")
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_plain(request, 503, "503 Service Unavailable")
}

fn send_plain(request: Request, status: u16, body: &str) -> Result<()> {
    let reply = Reply::new(status)
        .with_header("Content-Type", PLAIN)
        .with_body(body.as_bytes().to_vec());
    send_reply(request, reply)
}
