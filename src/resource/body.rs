//! Raw resource content and text encodings.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ResourceError;

// ============================================================================
// Body
// ============================================================================

/// Content as produced by a literal or a content function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Bytes(Vec<u8>),
}

impl Body {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Bytes(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<&[u8]> for Body {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encoding used to turn byte content into a string, and back for HTTP bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Base64,
    Latin1,
    Hex,
}

impl Encoding {
    /// Default encoding for a MIME type: utf-8 for text, base64 otherwise.
    pub fn for_mime(mime: &str) -> Self {
        if crate::utils::mime::is_text(mime) {
            Self::Utf8
        } else {
            Self::Base64
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Base64 => "base64",
            Self::Latin1 => "iso-8859-1",
            Self::Hex => "hex",
        }
    }

    /// Decode a body to its string form. Text passes through untouched.
    pub fn decode(self, body: Body) -> String {
        let bytes = match body {
            Body::Text(s) => return s,
            Body::Bytes(b) => b,
        };
        match self {
            Self::Utf8 => String::from_utf8(bytes)
                .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
            Self::Base64 => STANDARD.encode(bytes),
            Self::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Self::Hex => hex::encode(bytes),
        }
    }

    /// Turn string content back into the bytes sent over the wire.
    ///
    /// Strings that are not valid in the encoding are sent as their utf-8 bytes.
    pub fn encode(self, content: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => content.as_bytes().to_vec(),
            Self::Base64 => STANDARD
                .decode(content)
                .unwrap_or_else(|_| content.as_bytes().to_vec()),
            Self::Latin1 => {
                if content.chars().all(|c| (c as u32) < 256) {
                    content.chars().map(|c| c as u8).collect()
                } else {
                    content.as_bytes().to_vec()
                }
            }
            Self::Hex => hex::decode(content).unwrap_or_else(|_| content.as_bytes().to_vec()),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "base64" => Ok(Self::Base64),
            "iso-8859-1" | "latin1" | "binary" => Ok(Self::Latin1),
            "hex" => Ok(Self::Hex),
            other => Err(ResourceError::invalid(format!(
                "Unsupported encoding '{other}'"
            ))),
        }
    }
}

impl Serialize for Encoding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Encoding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_passes_through() {
        let body = Body::from("héllo");
        assert_eq!(Encoding::Base64.decode(body), "héllo");
    }

    #[test]
    fn test_bytes_decode_per_encoding() {
        let bytes = b"<body></body>".to_vec();
        assert_eq!(Encoding::Utf8.decode(bytes.clone().into()), "<body></body>");
        assert_eq!(
            Encoding::Base64.decode(bytes.clone().into()),
            "PGJvZHk+PC9ib2R5Pg=="
        );
        assert_eq!(Encoding::Hex.decode(vec![0xde, 0xad].into()), "dead");
        assert_eq!(Encoding::Latin1.decode(vec![0xe9].into()), "é");
    }

    #[test]
    fn test_encode_reverses_decode() {
        let png = vec![0x89, 0x50, 0x4e, 0x47, 0x00, 0xff];
        for encoding in [Encoding::Base64, Encoding::Hex, Encoding::Latin1] {
            let text = encoding.decode(png.clone().into());
            assert_eq!(encoding.encode(&text), png, "{encoding}");
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("UTF8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("latin1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert!("ebcdic".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_default_for_mime() {
        assert_eq!(Encoding::for_mime("text/css"), Encoding::Utf8);
        assert_eq!(Encoding::for_mime("image/png"), Encoding::Base64);
    }
}
