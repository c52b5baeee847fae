//! Where a resource's content comes from.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::Resource;
use super::body::Body;
use crate::error::Result;
use crate::proxy::Backend;

/// Future returned by a content function.
pub type ContentFuture = Pin<Box<dyn Future<Output = Result<Body>> + Send + 'static>>;

/// Zero-argument content producer, invoked with the resource as receiver on
/// every content request.
#[derive(Clone)]
pub struct ContentFn(Arc<dyn Fn(Resource) -> ContentFuture + Send + Sync>);

impl ContentFn {
    /// Asynchronous producer.
    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(Resource) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Body>> + Send + 'static,
    {
        Self(Arc::new(move |resource| Box::pin(f(resource))))
    }

    /// Synchronous producer, wrapped in an immediately ready future.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&Resource) -> Result<Body> + Send + Sync + 'static,
    {
        Self(Arc::new(move |resource| {
            let result = f(&resource);
            Box::pin(std::future::ready(result))
        }))
    }

    pub(crate) fn call(&self, resource: Resource) -> ContentFuture {
        (self.0)(resource)
    }
}

impl std::fmt::Debug for ContentFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentFn(..)")
    }
}

/// Closed set of content origins, selected once at creation.
#[derive(Debug, Clone)]
pub enum ContentSource {
    Literal(Body),
    Deferred(ContentFn),
    Backend(Backend),
    /// Ordered source paths within the owning set.
    Combine(Vec<String>),
    /// Etag-only placeholder awaiting cache inflation.
    Unresolved,
}

impl ContentSource {
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }

    pub fn literal(&self) -> Option<&Body> {
        match self {
            Self::Literal(body) => Some(body),
            _ => None,
        }
    }
}
