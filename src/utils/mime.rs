//! MIME type detection utilities.
//!
//! Provides consistent MIME type detection for resource paths.

/// Common MIME type constants.
pub mod types {
    // Text
    pub const HTML: &str = "text/html";
    pub const PLAIN: &str = "text/plain";
    pub const CSS: &str = "text/css";
    pub const JAVASCRIPT: &str = "application/javascript";
    pub const TYPESCRIPT: &str = "text/typescript";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const MARKDOWN: &str = "text/markdown";
    pub const YAML: &str = "text/yaml";
    pub const CSV: &str = "text/csv";

    // Binary
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const WASM: &str = "application/wasm";
    pub const ZIP: &str = "application/zip";
    pub const GZIP: &str = "application/gzip";
    pub const PDF: &str = "application/pdf";

    // Images
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";

    // Media
    pub const MP3: &str = "audio/mpeg";
    pub const MP4: &str = "video/mp4";
    pub const WEBM: &str = "video/webm";

    // Fonts
    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
}

/// Guess MIME type for a resource path.
///
/// Paths whose last segment has no extension are pages and default to
/// `text/html`.
pub fn from_path(path: &str) -> &'static str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((_, ext)) => from_extension(Some(&ext.to_ascii_lowercase())),
        None => types::HTML,
    }
}

/// Guess MIME type from file extension string.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("html" | "htm") => types::HTML,
        Some("css") => types::CSS,
        Some("js" | "mjs" | "cjs") => types::JAVASCRIPT,
        Some("ts" | "tsx" | "mts" | "cts") => types::TYPESCRIPT,
        Some("json" | "map") => types::JSON,
        Some("xml") => types::XML,
        Some("yaml" | "yml") => types::YAML,
        Some("csv") => types::CSV,
        Some("txt") => types::PLAIN,
        Some("md") => types::MARKDOWN,

        Some("svg") => types::SVG,
        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("webp") => types::WEBP,
        Some("ico") => types::ICO,

        Some("mp3") => types::MP3,
        Some("mp4" | "m4v") => types::MP4,
        Some("webm") => types::WEBM,

        Some("woff") => types::WOFF,
        Some("woff2") => types::WOFF2,
        Some("ttf") => types::TTF,

        Some("pdf") => types::PDF,
        Some("wasm") => types::WASM,
        Some("zip") => types::ZIP,
        Some("gz" | "gzip") => types::GZIP,

        _ => types::OCTET_STREAM,
    }
}

/// Check if the MIME type represents text content.
pub fn is_text(mime: &str) -> bool {
    mime.starts_with("text/")
        || mime.contains("html")
        || mime.contains("javascript")
        || mime == types::JSON
        || mime == types::XML
        || mime == types::SVG
}

/// Compose a `Content-Type` header value; only textual types carry a charset.
pub fn content_type(mime: &str, charset: &str) -> String {
    if is_text(mime) {
        format!("{mime}; charset={charset}")
    } else {
        mime.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(from_path("/index.html"), types::HTML);
        assert_eq!(from_path("/style.css"), types::CSS);
        assert_eq!(from_path("/app.js"), types::JAVASCRIPT);
        assert_eq!(from_path("/logo.PNG"), types::PNG);
        assert_eq!(from_path("/unknown.xyz"), types::OCTET_STREAM);
    }

    #[test]
    fn test_from_path_without_extension() {
        assert_eq!(from_path("/"), types::HTML);
        assert_eq!(from_path("/about"), types::HTML);
        assert_eq!(from_path("/v1.2/about"), types::HTML);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(
            content_type(types::JAVASCRIPT, "utf-8"),
            "application/javascript; charset=utf-8"
        );
        assert_eq!(
            content_type(types::HTML, "iso-8859-1"),
            "text/html; charset=iso-8859-1"
        );
        assert_eq!(content_type(types::PNG, "base64"), "image/png");
    }

    #[test]
    fn test_is_text() {
        assert!(is_text(types::HTML));
        assert!(is_text(types::CSS));
        assert!(is_text(types::JAVASCRIPT));
        assert!(is_text(types::JSON));
        assert!(!is_text(types::PNG));
        assert!(!is_text(types::OCTET_STREAM));
    }
}
