//! Resource options and their validation.

use super::body::{Body, Encoding};
use super::headers::Headers;
use super::source::ContentFn;
use crate::error::{ResourceError, Result};
use crate::utils::path::is_url;

/// Options for creating a resource.
///
/// Exactly one of content (literal or function), `file`, `combine` or
/// `backend` may be set; an etag alone declares a placeholder whose content
/// must come from a cache.
#[derive(Debug, Clone, Default)]
pub struct ResourceSpec {
    pub path: Option<String>,
    pub content: Option<Body>,
    pub content_fn: Option<ContentFn>,
    pub file: Option<String>,
    pub combine: Option<Vec<String>>,
    pub backend: Option<String>,
    pub etag: Option<String>,
    pub headers: Headers,
    pub encoding: Option<Encoding>,
    pub cacheable: Option<bool>,
    pub minify: bool,
    pub enclose: bool,
    pub exports: Vec<String>,
    pub alternatives: Vec<AlternativeSpec>,
    /// Content already went through `enclose`/`minify` (wire data).
    pub(crate) preprocessed: bool,
}

impl ResourceSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<Body>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_content_fn(mut self, content: ContentFn) -> Self {
        self.content_fn = Some(content);
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_combine<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.combine = Some(sources.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn with_cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = Some(cacheable);
        self
    }

    pub fn with_minify(mut self) -> Self {
        self.minify = true;
        self
    }

    pub fn with_enclose<I, S>(mut self, exports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enclose = true;
        self.exports = exports.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_alternative(mut self, alternative: AlternativeSpec) -> Self {
        self.alternatives.push(alternative);
        self
    }

    pub(crate) fn has_content(&self) -> bool {
        self.content.is_some() || self.content_fn.is_some()
    }

    /// Checks that apply to any resource spec, whatever layer adds it.
    pub(crate) fn validate_origins(&self) -> Result<()> {
        let origins = [
            self.has_content(),
            self.file.is_some(),
            self.combine.is_some(),
            self.backend.is_some(),
        ];
        if origins.iter().filter(|set| **set).count() > 1 {
            return Err(ResourceError::invalid(
                "Resource can only have one of content, file, backend, combine",
            ));
        }
        let path = self.path.as_deref().unwrap_or_default();
        if path.is_empty() {
            return Err(ResourceError::invalid("Resource must have path"));
        }
        if !is_url(path) && path.split('/').any(|segment| segment == "..") {
            return Err(ResourceError::invalid(format!(
                "Resource path '{path}' must not contain '..' segments"
            )));
        }
        Ok(())
    }

    /// Checks for resources that carry their own content origin.
    pub(crate) fn validate_content(&self) -> Result<()> {
        let path = self.path.as_deref().unwrap_or_default();
        let placeholder_ok = self.etag.is_some() || is_url(path);
        if !self.has_content()
            && self.backend.is_none()
            && self.combine.is_none()
            && !placeholder_ok
        {
            return Err(ResourceError::invalid(
                "No content: Resource must have content, etag or backend",
            ));
        }
        if self.backend.is_some() && self.encoding.is_some() {
            return Err(ResourceError::invalid(
                "Proxy resource cannot have hard-coded encoding",
            ));
        }
        Ok(())
    }
}

/// Alternate representation of a resource under another MIME type.
#[derive(Debug, Clone)]
pub struct AlternativeSpec {
    pub mime_type: String,
    pub content: Option<Body>,
    pub content_fn: Option<ContentFn>,
    pub etag: Option<String>,
    pub encoding: Option<Encoding>,
}

impl AlternativeSpec {
    pub fn new(mime_type: impl Into<String>, content: impl Into<Body>) -> Self {
        Self {
            mime_type: mime_type.into(),
            content: Some(content.into()),
            content_fn: None,
            etag: None,
            encoding: None,
        }
    }

    pub fn deferred(mime_type: impl Into<String>, content: ContentFn) -> Self {
        Self {
            mime_type: mime_type.into(),
            content: None,
            content_fn: Some(content),
            etag: None,
            encoding: None,
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_origins_rejected() {
        let spec = ResourceSpec::new("/a.js")
            .with_content("x")
            .with_backend("localhost:8080");
        let err = spec.validate_origins().unwrap_err();
        assert!(err.to_string().contains("only have one of"));
    }

    #[test]
    fn test_missing_path_rejected() {
        let spec = ResourceSpec::default().with_content("x");
        assert!(spec.validate_origins().is_err());
        assert!(ResourceSpec::new("").with_content("x").validate_origins().is_err());
    }

    #[test]
    fn test_parent_segments_rejected() {
        let spec = ResourceSpec::new("/a/../b.js").with_content("x");
        assert!(spec.validate_origins().is_err());
    }

    #[test]
    fn test_etag_only_is_valid() {
        let spec = ResourceSpec::new("/a.js").with_etag("e1");
        assert!(spec.validate_origins().is_ok());
        assert!(spec.validate_content().is_ok());
    }

    #[test]
    fn test_no_content_rejected() {
        let err = ResourceSpec::new("/a.js").validate_content().unwrap_err();
        assert!(err.to_string().starts_with("No content"));
    }

    #[test]
    fn test_url_path_needs_no_content() {
        assert!(ResourceSpec::new("http://cdn/thing.js").validate_content().is_ok());
    }

    #[test]
    fn test_backend_with_encoding_rejected() {
        let spec = ResourceSpec::new("/api")
            .with_backend("localhost")
            .with_encoding(Encoding::Utf8);
        assert!(spec.validate_content().is_err());
    }
}
