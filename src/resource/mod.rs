//! Resources: addressable content units.
//!
//! A [`Resource`] pairs a normalized path with a content origin, headers,
//! an optional etag and a chain of [`Processor`]s. Content is resolved
//! lazily through [`Resource::content`].
//!
//! # Etags
//!
//! A user-supplied etag is kept as long as the resource has no processors
//! and no alternatives. Adding either derives a new etag from the base etag,
//! literal content, processor names and alternatives (sorted by MIME type so
//! registration order does not matter). Deferred content without a base
//! etag never gets a derived one.
//!
//! # Handles
//!
//! `Resource` is a cheap clone handle; clones share processors, alternatives
//! and etag.

mod body;
mod data;
mod headers;
mod processor;
mod source;
mod spec;

pub use body::{Body, Encoding};
pub use data::{AlternativeData, ResourceData, SerializeOptions};
pub use headers::Headers;
pub(crate) use processor::panic_message;
pub use processor::{Processor, minify_css, minify_js};
pub use source::{ContentFn, ContentFuture, ContentSource};
pub use spec::{AlternativeSpec, ResourceSpec};

use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::{ResourceError, Result};
use crate::proxy::{Backend, Proxy};
use crate::utils::hash::FieldHasher;
use crate::utils::mime;
use crate::utils::path::{is_url, normalize_path, strip_segment_prefix};

// ============================================================================
// Resource
// ============================================================================

#[derive(Clone)]
pub struct Resource(Arc<Inner>);

struct Inner {
    path: String,
    source: ContentSource,
    encoding: Encoding,
    /// User headers, overlaid on the computed defaults.
    headers: Headers,
    /// MIME type of an alternative; primary resources infer it from the path.
    mime_override: Option<String>,
    cacheable: bool,
    enclose: bool,
    exports: Vec<String>,
    minify: bool,
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    base_etag: Option<String>,
    etag: Option<String>,
    processors: Vec<Processor>,
    alternatives: Vec<Resource>,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("path", &self.0.path)
            .field("etag", &self.etag())
            .field("source", &self.0.source)
            .finish()
    }
}

impl Resource {
    /// Build a resource from its options.
    ///
    /// File origins are resolved by [`crate::set::ResourceSet::add`]; passing
    /// one here is an error.
    pub fn create(spec: ResourceSpec) -> Result<Self> {
        spec.validate_origins()?;
        spec.validate_content()?;
        if spec.file.is_some() {
            return Err(ResourceError::invalid(
                "File resources must be added through a resource set",
            ));
        }

        let path = normalize_path(spec.path.as_deref().unwrap_or_default());
        let source = if let Some(body) = spec.content {
            ContentSource::Literal(body)
        } else if let Some(content_fn) = spec.content_fn {
            ContentSource::Deferred(content_fn)
        } else if let Some(backend) = &spec.backend {
            ContentSource::Backend(Backend::parse(backend)?)
        } else if let Some(combine) = spec.combine {
            ContentSource::Combine(combine.iter().map(|p| normalize_path(p)).collect())
        } else if spec.etag.is_none() && is_url(&path) {
            ContentSource::Literal(Body::Text(path.clone()))
        } else {
            ContentSource::Unresolved
        };

        let encoding = spec
            .encoding
            .unwrap_or_else(|| Encoding::for_mime(mime::from_path(&path)));

        let resource = Self(Arc::new(Inner {
            path,
            source,
            encoding,
            headers: spec.headers,
            mime_override: None,
            cacheable: spec.cacheable.unwrap_or(true),
            enclose: spec.enclose,
            exports: spec.exports,
            minify: spec.minify,
            state: RwLock::new(State {
                etag: spec.etag.clone(),
                base_etag: spec.etag,
                ..State::default()
            }),
        }));

        if spec.preprocessed {
            // Wire data: content is already processed and the etag final.
            let alternatives = spec
                .alternatives
                .into_iter()
                .map(|alt| resource.alternative(alt))
                .collect::<Result<Vec<_>>>()?;
            resource.0.state.write().alternatives = alternatives;
        } else {
            if resource.0.enclose {
                resource.add_processor(Processor::enclose(resource.0.exports.clone()));
            }
            if resource.0.minify {
                resource.add_processor(Processor::minify());
            }
            for alt in spec.alternatives {
                resource.add_alternative(alt)?;
            }
        }
        Ok(resource)
    }

    fn alternative(&self, spec: AlternativeSpec) -> Result<Self> {
        let source = match (spec.content, spec.content_fn) {
            (Some(body), None) => ContentSource::Literal(body),
            (None, Some(content_fn)) => ContentSource::Deferred(content_fn),
            (None, None) if spec.etag.is_some() => ContentSource::Unresolved,
            _ => {
                return Err(ResourceError::invalid(format!(
                    "Alternative '{}' for '{}' must have exactly one content origin",
                    spec.mime_type, self.0.path
                )));
            }
        };
        let encoding = spec
            .encoding
            .unwrap_or_else(|| Encoding::for_mime(&spec.mime_type));
        Ok(Self(Arc::new(Inner {
            path: self.0.path.clone(),
            source,
            encoding,
            headers: Headers::new(),
            mime_override: Some(spec.mime_type),
            cacheable: self.0.cacheable,
            enclose: false,
            exports: Vec::new(),
            minify: false,
            state: RwLock::new(State {
                etag: spec.etag.clone(),
                base_etag: spec.etag,
                ..State::default()
            }),
        })))
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn path(&self) -> &str {
        &self.0.path
    }

    pub fn etag(&self) -> Option<String> {
        self.0.state.read().etag.clone()
    }

    pub fn encoding(&self) -> Encoding {
        self.0.encoding
    }

    pub fn cacheable(&self) -> bool {
        self.0.cacheable
    }

    pub fn source(&self) -> &ContentSource {
        &self.0.source
    }

    pub fn is_backend(&self) -> bool {
        self.0.source.is_backend()
    }

    pub fn is_unresolved(&self) -> bool {
        self.0.source.is_unresolved()
    }

    /// Ordered source paths of a combined resource.
    pub fn combine(&self) -> Option<&[String]> {
        match &self.0.source {
            ContentSource::Combine(paths) => Some(paths),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> String {
        self.0
            .mime_override
            .clone()
            .unwrap_or_else(|| mime::from_path(&self.0.path).to_string())
    }

    /// Headers to serve the resource with.
    ///
    /// Content resources get a `Content-Type`; an etag adds `ETag`. User
    /// headers override both.
    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        if !self.is_backend() {
            headers.insert(
                "Content-Type",
                mime::content_type(&self.mime_type(), self.0.encoding.as_str()),
            );
        }
        if let Some(etag) = self.etag() {
            headers.insert("ETag", etag);
        }
        headers.extend(&self.0.headers);
        headers
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers().get(name).map(str::to_string)
    }

    /// User-supplied headers only.
    pub fn user_headers(&self) -> &Headers {
        &self.0.headers
    }

    // ------------------------------------------------------------------------
    // Processors and alternatives
    // ------------------------------------------------------------------------

    pub fn add_processor(&self, processor: Processor) -> &Self {
        let mut state = self.0.state.write();
        state.processors.push(processor);
        self.derive_etag(&mut state);
        self
    }

    /// Register (or replace) the representation for `spec.mime_type`.
    pub fn add_alternative(&self, spec: AlternativeSpec) -> Result<&Self> {
        let alternative = self.alternative(spec)?;
        let mime_type = alternative.mime_type();
        let mut state = self.0.state.write();
        state.alternatives.retain(|alt| alt.mime_type() != mime_type);
        state.alternatives.push(alternative);
        self.derive_etag(&mut state);
        Ok(self)
    }

    pub fn alternatives(&self) -> Vec<Resource> {
        self.0.state.read().alternatives.clone()
    }

    /// The representation for `mime_type`: this resource, an alternative, or none.
    pub fn get_content_for(&self, mime_type: &str) -> Option<Resource> {
        if self.mime_type() == mime_type {
            return Some(self.clone());
        }
        self.0
            .state
            .read()
            .alternatives
            .iter()
            .find(|alt| alt.mime_type() == mime_type)
            .cloned()
    }

    fn derive_etag(&self, state: &mut State) {
        let literal = self.0.source.literal();
        if state.base_etag.is_none() && literal.is_none() {
            return;
        }
        if state.processors.is_empty() && state.alternatives.is_empty() {
            state.etag = state.base_etag.clone();
            return;
        }

        let mut hasher = FieldHasher::new();
        hasher
            .field(state.base_etag.as_deref().unwrap_or_default())
            .field(literal.map_or(&[][..], Body::as_bytes));
        for processor in &state.processors {
            hasher.field(processor.name());
        }
        let mut alternatives: Vec<_> = state.alternatives.iter().collect();
        alternatives.sort_by_key(|alt| alt.mime_type());
        for alt in alternatives {
            hasher
                .field(&alt.mime_type())
                .field(&alt.etag().unwrap_or_default())
                .field(alt.0.source.literal().map_or(&[][..], Body::as_bytes));
        }
        state.etag = Some(hasher.finish().to_hex());
    }

    // ------------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------------

    /// Resolve content: decode to a string, then run the processors.
    ///
    /// Combined resources are resolved by their set, see
    /// [`crate::set::ResourceSet::resolve_content`].
    pub async fn content(&self) -> Result<String> {
        let raw = match &self.0.source {
            ContentSource::Literal(body) => self.0.encoding.decode(body.clone()),
            ContentSource::Deferred(content_fn) => {
                let body = content_fn.call(self.clone()).await?;
                self.0.encoding.decode(body)
            }
            ContentSource::Backend(_) => return Err(ResourceError::Proxied(self.0.path.clone())),
            ContentSource::Combine(_) => {
                return Err(ResourceError::Combine {
                    path: self.0.path.clone(),
                    message: "combined content is resolved by its resource set".to_string(),
                });
            }
            ContentSource::Unresolved => {
                return Err(ResourceError::Unavailable {
                    path: self.0.path.clone(),
                    etag: self.etag().unwrap_or_default(),
                });
            }
        };
        self.process(raw)
    }

    /// Run all processors over `content`, in registration order.
    pub fn process(&self, content: String) -> Result<String> {
        let processors = self.0.state.read().processors.clone();
        processors
            .iter()
            .try_fold(content, |content, processor| processor.run(self, content))
    }

    /// Whether a request for `path` should be answered by this resource.
    ///
    /// Backends answer for every path below their own.
    pub fn responds_to(&self, path: &str) -> bool {
        let path = normalize_path(path);
        if self.is_backend() {
            strip_segment_prefix(&path, &self.0.path).is_some()
        } else {
            path == self.0.path
        }
    }

    /// Proxy for a backend resource, mounted under `proxy_path`.
    pub fn proxy(&self, proxy_path: &str) -> Option<Proxy> {
        match &self.0.source {
            ContentSource::Backend(backend) => Some(Proxy::new(backend.clone(), proxy_path)),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------------

    /// Wire form of the resource.
    ///
    /// Backends serialize as `{path, backend}` and combined resources as
    /// their source list. Content is included only when
    /// `options.include_content` is set.
    pub async fn serialize(&self, options: SerializeOptions) -> Result<ResourceData> {
        let mut data = ResourceData {
            path: self.0.path.clone(),
            ..ResourceData::default()
        };
        if let ContentSource::Backend(backend) = &self.0.source {
            data.backend = Some(backend.as_str().to_string());
            return Ok(data);
        }

        data.etag = self.etag();
        data.headers = (!self.0.headers.is_empty()).then(|| self.0.headers.clone());
        data.cacheable = (!self.0.cacheable).then_some(false);
        data.enclose = self.0.enclose;
        data.exports = (!self.0.exports.is_empty()).then(|| self.0.exports.clone());
        data.minify = self.0.minify;

        match &self.0.source {
            ContentSource::Combine(paths) => data.combine = Some(paths.clone()),
            ContentSource::Unresolved => {}
            _ if options.include_content => {
                data.content = Some(self.content().await?);
                data.encoding = Some(self.0.encoding);
                let mut alternatives = Vec::new();
                for alt in self.alternatives() {
                    alternatives.push(AlternativeData {
                        mime_type: alt.mime_type(),
                        content: Some(alt.content().await?),
                        encoding: Some(alt.encoding()),
                        etag: alt.etag(),
                    });
                }
                data.alternatives = (!alternatives.is_empty()).then_some(alternatives);
            }
            _ => {}
        }
        Ok(data)
    }

    /// Snapshot with resolved content and the same etag, without processors.
    pub(crate) fn cached_copy(&self, content: String, alternatives: Vec<Resource>) -> Self {
        let inner = &self.0;
        Self(Arc::new(Inner {
            path: inner.path.clone(),
            source: ContentSource::Literal(Body::Text(content)),
            encoding: inner.encoding,
            headers: inner.headers.clone(),
            mime_override: inner.mime_override.clone(),
            cacheable: inner.cacheable,
            enclose: inner.enclose,
            exports: inner.exports.clone(),
            minify: inner.minify,
            state: RwLock::new(State {
                base_etag: self.etag(),
                etag: self.etag(),
                processors: Vec::new(),
                alternatives,
            }),
        }))
    }

    /// Whether both handles point at the same resource.
    pub fn ptr_eq(&self, other: &Resource) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(spec: ResourceSpec) -> Resource {
        Resource::create(spec).unwrap()
    }

    #[test]
    fn test_path_is_normalized() {
        let r = resource(ResourceSpec::new("foo.js/").with_content("x"));
        assert_eq!(r.path(), "/foo.js");
    }

    #[test]
    fn test_default_headers() {
        let r = resource(ResourceSpec::new("/foo.js").with_content("x"));
        let headers = r.headers();
        assert_eq!(
            headers.get("Content-Type"),
            Some("application/javascript; charset=utf-8")
        );
        assert_eq!(headers.get("ETag"), None);
    }

    #[test]
    fn test_extensionless_path_is_html() {
        let r = resource(ResourceSpec::new("/about").with_content("<h1>hi</h1>"));
        assert_eq!(r.header("Content-Type").as_deref(), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn test_user_headers_override_defaults() {
        let r = resource(
            ResourceSpec::new("/foo.js")
                .with_content("x")
                .with_etag("e1")
                .with_header("content-type", "text/plain"),
        );
        assert_eq!(r.header("Content-Type").as_deref(), Some("text/plain"));
        assert_eq!(r.header("ETag").as_deref(), Some("e1"));
    }

    #[test]
    fn test_binary_defaults_to_base64_without_charset() {
        let r = resource(ResourceSpec::new("/logo.png").with_content(vec![1u8, 2, 3]));
        assert_eq!(r.encoding(), Encoding::Base64);
        assert_eq!(r.header("Content-Type").as_deref(), Some("image/png"));
    }

    #[test]
    fn test_backend_has_no_content_type() {
        let r = resource(ResourceSpec::new("/api").with_backend("localhost:8080"));
        assert!(r.headers().get("Content-Type").is_none());
    }

    #[test]
    fn test_file_origin_needs_a_set() {
        assert!(Resource::create(ResourceSpec::new("/a.js").with_file("a.js")).is_err());
    }

    #[tokio::test]
    async fn test_literal_content() {
        let r = resource(ResourceSpec::new("/a.txt").with_content("hello"));
        assert_eq!(r.content().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_buffer_content_is_decoded() {
        let r = resource(ResourceSpec::new("/a.bin").with_content(vec![0xde_u8, 0xad]));
        assert_eq!(r.content().await.unwrap(), "3q0=");
        let r = resource(
            ResourceSpec::new("/a.txt")
                .with_content(b"hi".to_vec())
                .with_encoding(Encoding::Hex),
        );
        assert_eq!(r.content().await.unwrap(), "6869");
    }

    #[tokio::test]
    async fn test_deferred_content_sees_resource() {
        let r = resource(ResourceSpec::new("/a.txt").with_content_fn(ContentFn::deferred(
            |resource: Resource| async move { Ok(Body::from(format!("at {}", resource.path()))) },
        )));
        assert_eq!(r.content().await.unwrap(), "at /a.txt");
    }

    #[tokio::test]
    async fn test_deferred_error_propagates() {
        let r = resource(ResourceSpec::new("/a.txt").with_content_fn(ContentFn::sync(|res| {
            Err(ResourceError::content(res.path(), "Oh noes"))
        })));
        let err = r.content().await.unwrap_err();
        assert!(err.to_string().contains("Oh noes"));
    }

    #[tokio::test]
    async fn test_processors_run_in_order() {
        let r = resource(ResourceSpec::new("/a.txt").with_content("a"));
        r.add_processor(Processor::new("b", |_, c| Ok(Some(format!("{c}b")))));
        r.add_processor(Processor::new("c", |_, c| Ok(Some(format!("{c}c")))));
        assert_eq!(r.content().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_processor_none_keeps_content() {
        let r = resource(ResourceSpec::new("/a.txt").with_content("a"));
        r.add_processor(Processor::new("noop", |_, _| Ok(None)));
        r.add_processor(Processor::new("blank", |_, _| Ok(Some(String::new()))));
        assert_eq!(r.content().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_processor_error_keeps_code() {
        let r = resource(ResourceSpec::new("/a.js").with_content("a"));
        r.add_processor(Processor::new("dep", |_, _| {
            Err(ResourceError::io("dep.js", std::io::Error::from(std::io::ErrorKind::NotFound)))
        }));
        let err = r.content().await.unwrap_err();
        assert_eq!(err.code(), "ENOENT");
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_processor_panic_rejects() {
        let r = resource(ResourceSpec::new("/a.txt").with_content("a"));
        r.add_processor(Processor::new("boom", |_, _| panic!("Oh noes")));
        let err = r.content().await.unwrap_err();
        assert_eq!(err.code(), "PROCESSOR");
        assert!(err.to_string().contains("Oh noes"));
    }

    #[tokio::test]
    async fn test_enclose_processor_installed() {
        let r = resource(
            ResourceSpec::new("/a.js")
                .with_content("var a = 42;")
                .with_enclose(["a"]),
        );
        assert!(r.content().await.unwrap().contains("global.a=a;"));
    }

    #[tokio::test]
    async fn test_unresolved_content_rejects() {
        let r = resource(ResourceSpec::new("/a.js").with_etag("e1"));
        assert!(r.is_unresolved());
        let err = r.content().await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_url_resource_content_is_its_path() {
        let r = resource(ResourceSpec::new("http://cdn/thing.js"));
        assert_eq!(r.path(), "http://cdn/thing.js");
        assert_eq!(r.content().await.unwrap(), "http://cdn/thing.js");
    }

    #[test]
    fn test_etag_kept_without_processors() {
        let r = resource(ResourceSpec::new("/a.js").with_content("x").with_etag("e1"));
        assert_eq!(r.etag().as_deref(), Some("e1"));
    }

    #[test]
    fn test_etag_deterministic() {
        let make = || {
            let r = resource(ResourceSpec::new("/a.js").with_content("x"));
            r.add_processor(Processor::new("p", |_, _| Ok(None)));
            r.etag()
        };
        assert!(make().is_some());
        assert_eq!(make(), make());
    }

    #[test]
    fn test_etag_ignores_alternative_order() {
        let css = AlternativeSpec::new("text/css", "body {}");
        let json = AlternativeSpec::new("application/json", "{}");
        let first = resource(
            ResourceSpec::new("/a")
                .with_content("x")
                .with_alternative(css.clone())
                .with_alternative(json.clone()),
        );
        let second = resource(
            ResourceSpec::new("/a")
                .with_content("x")
                .with_alternative(json)
                .with_alternative(css),
        );
        assert_eq!(first.etag(), second.etag());
    }

    #[test]
    fn test_etag_changes_with_alternative_content() {
        let first = resource(
            ResourceSpec::new("/a")
                .with_content("x")
                .with_alternative(AlternativeSpec::new("text/css", "body {}")),
        );
        let second = resource(
            ResourceSpec::new("/a")
                .with_content("x")
                .with_alternative(AlternativeSpec::new("text/css", "p {}")),
        );
        assert_ne!(first.etag(), second.etag());
    }

    #[test]
    fn test_etag_changes_with_processor() {
        let r = resource(ResourceSpec::new("/a.js").with_content("x").with_etag("e1"));
        r.add_processor(Processor::new("p", |_, _| Ok(None)));
        assert_ne!(r.etag().as_deref(), Some("e1"));
    }

    #[tokio::test]
    async fn test_get_content_for() {
        let r = resource(
            ResourceSpec::new("/a")
                .with_content("<p>x</p>")
                .with_alternative(AlternativeSpec::new("application/json", "{\"x\":1}")),
        );
        assert!(r.get_content_for("text/html").unwrap().ptr_eq(&r));
        let alt = r.get_content_for("application/json").unwrap();
        assert_eq!(alt.content().await.unwrap(), "{\"x\":1}");
        assert_eq!(
            alt.header("Content-Type").as_deref(),
            Some("application/json; charset=utf-8")
        );
        assert!(r.get_content_for("text/css").is_none());
    }

    #[test]
    fn test_responds_to() {
        let r = resource(ResourceSpec::new("/a.js").with_content("x"));
        assert!(r.responds_to("/a.js"));
        assert!(r.responds_to("a.js/"));
        assert!(!r.responds_to("/a.js/b"));

        let proxy = resource(ResourceSpec::new("/api").with_backend("localhost:8080"));
        assert!(proxy.responds_to("/api"));
        assert!(proxy.responds_to("/api/users/1"));
        assert!(!proxy.responds_to("/apiary"));
    }

    #[tokio::test]
    async fn test_serialize_content() {
        let r = resource(
            ResourceSpec::new("/a.js")
                .with_content("x")
                .with_etag("e1")
                .with_header("X-Foo", "bar"),
        );
        let data = r.serialize(SerializeOptions::default()).await.unwrap();
        assert_eq!(data.content.as_deref(), Some("x"));
        assert_eq!(data.encoding, Some(Encoding::Utf8));
        assert_eq!(data.etag.as_deref(), Some("e1"));
        assert_eq!(data.headers.unwrap().get("x-foo"), Some("bar"));

        let data = r
            .serialize(SerializeOptions {
                include_content: false,
            })
            .await
            .unwrap();
        assert!(data.content.is_none());
        assert_eq!(data.etag.as_deref(), Some("e1"));
    }

    #[tokio::test]
    async fn test_serialize_backend() {
        let r = resource(ResourceSpec::new("/api").with_backend("localhost:8080"));
        let data = r.serialize(SerializeOptions::default()).await.unwrap();
        assert_eq!(data.backend.as_deref(), Some("localhost:8080"));
        assert!(data.content.is_none());
    }

    #[tokio::test]
    async fn test_serialized_processed_resource_is_not_reprocessed() {
        let r = resource(
            ResourceSpec::new("/a.js")
                .with_content("var a = 42;")
                .with_enclose(Vec::<String>::new()),
        );
        let data = r.serialize(SerializeOptions::default()).await.unwrap();
        let copy = resource(data.into_wire_spec());
        assert_eq!(copy.etag(), r.etag());
        assert_eq!(copy.content().await.unwrap(), r.content().await.unwrap());
    }

    #[tokio::test]
    async fn test_cached_copy_keeps_identity() {
        let r = resource(ResourceSpec::new("/a.js").with_content("x").with_etag("e1"));
        r.add_processor(Processor::new("upper", |_, c| Ok(Some(c.to_uppercase()))));
        let copy = r.cached_copy(r.content().await.unwrap(), Vec::new());
        assert_eq!(copy.etag(), r.etag());
        assert_eq!(copy.content().await.unwrap(), "X");
    }
}
