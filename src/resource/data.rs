//! Wire format for serialized resources.
//!
//! ```json
//! {"path": "/app.js", "content": "...", "encoding": "utf-8", "etag": "...",
//!  "headers": {...}, "combine": [...], "backend": "...", "enclose": true,
//!  "exports": [...], "minify": true, "alternatives": [...], "cacheable": true}
//! ```

use serde::{Deserialize, Serialize};

use super::body::Encoding;
use super::headers::Headers;
use super::spec::{AlternativeSpec, ResourceSpec};

/// Serialized resource; also the shape of `[[resources]]` config entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceData {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combine: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub enclose: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub minify: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<AlternativeData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cacheable: Option<bool>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Serialized alternative representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeData {
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Options for [`super::Resource::serialize`].
#[derive(Debug, Clone, Copy)]
pub struct SerializeOptions {
    /// False when the receiver already caches this etag.
    pub include_content: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            include_content: true,
        }
    }
}

impl ResourceData {
    /// Spec for data authored by hand (config files): processors still apply.
    pub fn into_spec(self) -> ResourceSpec {
        self.build_spec(false)
    }

    /// Spec for data produced by `serialize`: content is already processed.
    pub(crate) fn into_wire_spec(self) -> ResourceSpec {
        self.build_spec(true)
    }

    fn build_spec(self, preprocessed: bool) -> ResourceSpec {
        let alternatives = self
            .alternatives
            .unwrap_or_default()
            .into_iter()
            .map(|alt| AlternativeSpec {
                mime_type: alt.mime_type,
                content: alt.content.map(Into::into),
                content_fn: None,
                etag: alt.etag,
                encoding: alt.encoding,
            })
            .collect();

        ResourceSpec {
            path: Some(self.path),
            content: self.content.map(Into::into),
            content_fn: None,
            file: self.file,
            combine: self.combine,
            backend: self.backend,
            etag: self.etag,
            headers: self.headers.unwrap_or_default(),
            encoding: self.encoding,
            cacheable: self.cacheable,
            minify: self.minify,
            enclose: self.enclose,
            exports: self.exports.unwrap_or_default(),
            alternatives,
            preprocessed,
        }
    }
}
