//! Load path manipulation.
//!
//! Entries are either exact resource paths or glob patterns matched against
//! the paths already in the set. Each call validates all entries before
//! changing anything.

use globset::GlobBuilder;

use super::{ResourceSet, State};
use crate::error::{ResourceError, Result};
use crate::utils::path::normalize_path;

fn is_glob(path: &str) -> bool {
    path.contains(['*', '?', '[', '{'])
}

impl ResourceSet {
    /// Paths to load, in order.
    pub fn load_path(&self) -> Vec<String> {
        self.0.state.read().load_path.clone()
    }

    pub fn append_to_load<I, S>(&self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.0.state.write();
        let resolved = resolve(&state, paths)?;
        state.load_path.extend(resolved);
        Ok(())
    }

    /// Insert `paths` at the front of the load path, keeping their order.
    pub fn prepend_to_load<I, S>(&self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.0.state.write();
        let mut load_path = resolve(&state, paths)?;
        load_path.append(&mut state.load_path);
        state.load_path = load_path;
        Ok(())
    }

    pub fn clear_load(&self) {
        self.0.state.write().load_path.clear();
    }
}

fn resolve<I, S>(state: &State, paths: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut resolved: Vec<String> = Vec::new();
    for entry in paths {
        let entry = entry.as_ref();
        if is_glob(entry) {
            let pattern = entry.trim_start_matches('/');
            let matcher = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| ResourceError::Glob(format!("invalid glob {entry:?}: {e}")))?
                .compile_matcher();
            let matches: Vec<&String> = state
                .resources
                .keys()
                .filter(|path| matcher.is_match(path.trim_start_matches('/')))
                .collect();
            if matches.is_empty() {
                return Err(ResourceError::invalid(format!(
                    "'{entry}' matched no resources to add to load path"
                )));
            }
            // Overlapping globs are expected; only new matches are added.
            for path in matches {
                if !state.load_path.contains(path) && !resolved.contains(path) {
                    resolved.push(path.clone());
                }
            }
            continue;
        }

        let path = normalize_path(entry);
        if !state.resources.contains_key(&path) {
            return Err(ResourceError::invalid(format!(
                "Cannot add non-existent resource {path} to load path"
            )));
        }
        if state.load_path.contains(&path) || resolved.contains(&path) {
            return Err(ResourceError::invalid(format!(
                "{path} is already in the load path"
            )));
        }
        resolved.push(path);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceSpec;

    async fn set_with(paths: &[&str]) -> ResourceSet {
        let set = ResourceSet::default();
        for path in paths {
            set.add(ResourceSpec::new(*path).with_content("x"))
                .await
                .unwrap();
        }
        set
    }

    #[tokio::test]
    async fn test_append_and_prepend() {
        let set = set_with(&["/a.js", "/b.js", "/c.js", "/d.js"]).await;
        set.append_to_load(["/c.js"]).unwrap();
        set.prepend_to_load(["a.js", "/b.js"]).unwrap();
        set.append_to_load(["/d.js"]).unwrap();
        assert_eq!(set.load_path(), vec!["/a.js", "/b.js", "/c.js", "/d.js"]);
    }

    #[tokio::test]
    async fn test_unknown_path_rejected_atomically() {
        let set = set_with(&["/a.js"]).await;
        let err = set.append_to_load(["/a.js", "/nope.js"]).unwrap_err();
        assert!(err.to_string().contains("/nope.js"));
        assert!(set.load_path().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let set = set_with(&["/a.js"]).await;
        set.append_to_load(["/a.js"]).unwrap();
        assert!(set.append_to_load(["/a.js"]).is_err());
        assert!(set.prepend_to_load(["/a.js"]).is_err());
        assert_eq!(set.load_path(), vec!["/a.js"]);
    }

    #[tokio::test]
    async fn test_glob_entries() {
        let set = set_with(&["/lib/a.js", "/lib/b.js", "/lib/c.css", "/main.js"]).await;
        set.append_to_load(["/lib/b.js"]).unwrap();
        set.append_to_load(["/lib/*.js", "/main.js"]).unwrap();
        assert_eq!(set.load_path(), vec!["/lib/b.js", "/lib/a.js", "/main.js"]);
        assert!(set.append_to_load(["/nothing/*.js"]).is_err());
    }
}
