//! `[set]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [set]
//! root = "."             # root path for file resources (relative to config dir)
//! context_path = ""      # prefix of this set's paths below the server context
//! files = ["lib/*.js"]   # globs below root, each match added as a file resource
//! load = ["/app.js"]     # load path, exact paths or globs
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings of the configured resource set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetConfig {
    pub root: PathBuf,
    pub context_path: String,
    pub files: Vec<String>,
    pub load: Vec<String>,
}

impl Default for SetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            context_path: String::new(),
            files: Vec::new(),
            load: Vec::new(),
        }
    }
}
