//! Serve mounted resource sets over HTTP.
//!
//! The middleware answers requests below its context path from the sets
//! mounted on it. Requests outside the context path are left to the caller
//! (`respond` returns `None`); everything inside is answered, with 404 when
//! no set has the path.

mod http;

pub use http::{Reply, ResourceRequest};

use parking_lot::RwLock;
use percent_encoding::percent_decode_str;
use std::sync::Arc;

use crate::cache::ResourceSetCache;
use crate::debug;
use crate::error::ResourceError;
use crate::resource::Resource;
use crate::set::ResourceSet;
use crate::utils::mime::types::HTML;
use crate::utils::path::{join_url_path, normalize_path, strip_segment_prefix};

/// Served for `/` when no mounted set defines a root resource.
const DEFAULT_ROOT: &str =
    "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head><body></body></html>";

#[derive(Clone, Default)]
pub struct ResourceMiddleware(Arc<Inner>);

#[derive(Default)]
struct Inner {
    context_path: RwLock<String>,
    sets: RwLock<Vec<ResourceSet>>,
    cache: Option<ResourceSetCache>,
}

impl ResourceMiddleware {
    pub fn new(context_path: &str) -> Self {
        let middleware = Self::default();
        middleware.set_context_path(context_path);
        middleware
    }

    /// Middleware that inflates sets from `cache` on mount and caches their
    /// content on unmount.
    pub fn with_cache(context_path: &str, cache: ResourceSetCache) -> Self {
        let middleware = Self(Arc::new(Inner {
            cache: Some(cache),
            ..Inner::default()
        }));
        middleware.set_context_path(context_path);
        middleware
    }

    pub fn context_path(&self) -> String {
        self.0.context_path.read().clone()
    }

    pub fn set_context_path(&self, context_path: &str) {
        let context_path = context_path.trim_end_matches('/');
        *self.0.context_path.write() = if context_path.is_empty() {
            String::new()
        } else {
            normalize_path(context_path)
        };
    }

    pub fn cache(&self) -> Option<&ResourceSetCache> {
        self.0.cache.as_ref()
    }

    // ------------------------------------------------------------------------
    // Mounting
    // ------------------------------------------------------------------------

    /// Serve `set`; sets mounted earlier win on path collisions.
    pub async fn mount(&self, set: &ResourceSet) {
        if let Some(cache) = &self.0.cache {
            cache.inflate(set).await;
        }
        self.0.sets.write().push(set.clone());
    }

    /// Stop serving `set`. Returns false if it was not mounted.
    pub async fn unmount(&self, set: &ResourceSet) -> bool {
        let removed = {
            let mut sets = self.0.sets.write();
            let before = sets.len();
            sets.retain(|mounted| !mounted.ptr_eq(set));
            sets.len() != before
        };
        if removed && let Some(cache) = &self.0.cache {
            cache.cache(set).await;
        }
        removed
    }

    pub fn mounted(&self) -> Vec<ResourceSet> {
        self.0.sets.read().clone()
    }

    // ------------------------------------------------------------------------
    // Responding
    // ------------------------------------------------------------------------

    /// Answer `request`, or `None` when it lies outside the context path.
    pub async fn respond(&self, request: &ResourceRequest) -> Option<Reply> {
        let context_path = self.context_path();
        let decoded = percent_decode_str(request.path()).decode_utf8_lossy();
        let rest = strip_segment_prefix(&decoded, &context_path)?;
        let path = normalize_path(rest);

        let Some((set, resource)) = self.lookup(&path) else {
            if path == "/" {
                return Some(default_root(request));
            }
            debug!("serve"; "404 {}", path);
            let err = ResourceError::NotFound(path);
            return Some(Reply::error(404, err.code(), &err.to_string()));
        };

        if let Some(proxy) = resource.proxy(&join_url_path(&context_path, &set.context_path())) {
            return Some(proxy.respond(request).await);
        }
        Some(serve_resource(request, &set, &resource).await)
    }

    /// First mounted set, in mount order, with a resource for `path`.
    fn lookup(&self, path: &str) -> Option<(ResourceSet, Resource)> {
        let sets = self.0.sets.read().clone();
        sets.into_iter().find_map(|set| {
            let context_path = set.context_path();
            let rest = strip_segment_prefix(path, &context_path)?;
            let resource = set.find_responder(&normalize_path(rest))?;
            Some((set, resource))
        })
    }
}

async fn serve_resource(request: &ResourceRequest, set: &ResourceSet, resource: &Resource) -> Reply {
    let served = negotiate(request, resource);
    let mut reply = Reply::new(200);
    for (name, value) in served.headers().iter() {
        reply = reply.with_header(name, value);
    }

    if let Some(etag) = served.etag()
        && request
            .header("If-None-Match")
            .is_some_and(|tags| etag_matches(tags, &etag))
    {
        reply.status = 304;
        return reply;
    }

    match set.resolve_content(&served).await {
        Ok(_) if request.is_head() => reply,
        Ok(content) => reply.with_body(served.encoding().encode(&content)),
        Err(e) => {
            debug!("serve"; "failed to serve {}: {}", served.path(), e);
            let status = if e.is_not_found() { 404 } else { 500 };
            Reply::error(status, e.code(), &e.to_string())
        }
    }
}

/// The representation named by the request's `Accept` header, falling back
/// to the resource itself.
fn negotiate(request: &ResourceRequest, resource: &Resource) -> Resource {
    let Some(accept) = request.header("Accept") else {
        return resource.clone();
    };
    accept
        .split(',')
        .filter_map(|entry| entry.split(';').next())
        .map(str::trim)
        .find_map(|mime| resource.get_content_for(mime))
        .unwrap_or_else(|| resource.clone())
}

fn etag_matches(header: &str, etag: &str) -> bool {
    header.split(',').map(str::trim).any(|tag| {
        tag == "*" || tag.trim_start_matches("W/").trim_matches('"') == etag
    })
}

fn default_root(request: &ResourceRequest) -> Reply {
    let reply = Reply::new(200).with_header("Content-Type", format!("{HTML}; charset=utf-8"));
    if request.is_head() {
        reply
    } else {
        reply.with_body(DEFAULT_ROOT.as_bytes().to_vec())
    }
}
