//! Content hashing for etags using blake3.
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let etag = hash::fingerprint("some content"); // -> 64 hex chars
//! ```

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display first 16 chars of hex for brevity
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Hash byte data.
#[inline]
pub fn compute<T: AsRef<[u8]> + ?Sized>(data: &T) -> ContentHash {
    ContentHash::new(*blake3::hash(data.as_ref()).as_bytes())
}

/// Hash byte data and return the full hex digest.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    compute(data).to_hex()
}

/// Incremental hasher over length-prefixed fields.
///
/// Length prefixes keep `("ab", "c")` and `("a", "bc")` apart.
#[derive(Default)]
pub struct FieldHasher(blake3::Hasher);

impl FieldHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T: AsRef<[u8]> + ?Sized>(&mut self, data: &T) -> &mut Self {
        let data = data.as_ref();
        self.0.update(&(data.len() as u64).to_le_bytes());
        self.0.update(data);
        self
    }

    pub fn finish(&self) -> ContentHash {
        ContentHash::new(*self.0.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_display() {
        let hash = ContentHash::new([0xab; 32]);
        assert_eq!(format!("{}", hash), "abababababababab");
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(fingerprint("hello"), fingerprint("hello"));
        assert_ne!(fingerprint("hello"), fingerprint("hello!"));
        assert_eq!(fingerprint("hello").len(), 64);
    }

    #[test]
    fn test_field_hasher_separates_fields() {
        let a = FieldHasher::new().field("ab").field("c").finish();
        let b = FieldHasher::new().field("a").field("bc").finish();
        assert_ne!(a, b);
    }
}
