//! Path and URL utilities.
//!
//! Pure functions for path manipulation. No side effects.
//!
//! - [`route`]: resource path utilities (`normalize_path`, `is_url`, `strip_segment_prefix`, `join_url_path`)

pub mod route;

pub use route::{is_url, join_url_path, normalize_path, strip_segment_prefix};
