//! Versioned in-memory resource sets served over HTTP.
//!
//! - [`resource::Resource`]: one named unit of content with headers, an etag
//!   and a content origin (literal, producer function, file, combination of
//!   other resources, or a proxied backend).
//! - [`set::ResourceSet`]: an ordered collection of resources with a load
//!   path, serializable to a JSON wire format.
//! - [`cache::ResourceSetCache`]: content cached by `(path, etag)` across
//!   sets, with TTL expiry, a size budget and freezing.
//! - [`middleware::ResourceMiddleware`]: answers HTTP requests from mounted
//!   sets.

#[macro_use]
pub mod logger;

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod proxy;
pub mod resource;
pub mod serve;
pub mod set;
pub mod utils;

pub use cache::ResourceSetCache;
pub use error::{ResourceError, Result};
pub use middleware::{Reply, ResourceMiddleware, ResourceRequest};
pub use resource::{Resource, ResourceSpec};
pub use set::ResourceSet;
