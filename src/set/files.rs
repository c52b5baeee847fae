//! File-backed resources and glob expansion.

use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use globset::GlobBuilder;
use jwalk::WalkDir;

use crate::error::{ResourceError, Result};
use crate::resource::{Body, ContentFn, ResourceSpec};
use crate::utils::hash::FieldHasher;

fn outside_root(root: &Path, paths: &[&str]) -> ResourceError {
    let plural = if paths.len() > 1 {
        "Some paths are"
    } else {
        "A path is"
    };
    ResourceError::invalid(format!(
        "{plural} outside the project root. Set the root path to the desired root to refer to paths outside of {}.\n  {}",
        root.display(),
        paths.join("\n  ")
    ))
}

fn escapes_root(relative: &Path) -> bool {
    relative
        .components()
        .any(|c| matches!(c, Component::ParentDir))
}

/// Absolute location of `file` below `root`.
fn locate(root: &Path, file: &str) -> Result<PathBuf> {
    let path = Path::new(file);
    if path.is_absolute() {
        if !path.starts_with(root) || escapes_root(path) {
            return Err(outside_root(root, &[file]));
        }
        return Ok(path.to_path_buf());
    }
    if escapes_root(path) {
        return Err(outside_root(root, &[file]));
    }
    Ok(root.join(path))
}

/// Turn a `file` origin into deferred content read on every request.
///
/// Without an explicit etag, the file's size and modification time give one.
pub(super) async fn prepare(root: &Path, file: &str, mut spec: ResourceSpec) -> Result<ResourceSpec> {
    let location = locate(root, file)?;
    let meta = tokio::fs::metadata(&location)
        .await
        .map_err(|e| ResourceError::io(&location, e))?;
    if !meta.is_file() {
        return Err(ResourceError::invalid(format!("{file} is not a file")));
    }

    if spec.etag.is_none() {
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_nanos());
        let etag = FieldHasher::new()
            .field(location.to_string_lossy().as_bytes())
            .field(&meta.len().to_le_bytes())
            .field(&modified.to_le_bytes())
            .finish();
        spec.etag = Some(etag.to_hex());
    }

    spec.content_fn = Some(ContentFn::deferred(move |_| {
        let location = location.clone();
        async move {
            match tokio::fs::read(&location).await {
                Ok(bytes) => Ok(Body::Bytes(bytes)),
                Err(e) => Err(ResourceError::io(location, e)),
            }
        }
    }));
    Ok(spec)
}

/// Files below `root` matching `pattern`, as sorted `/`-separated relative paths.
pub(super) fn expand(root: &Path, pattern: &str) -> Result<Vec<String>> {
    let relative = pattern.trim_start_matches('/');
    if escapes_root(Path::new(relative)) {
        return Err(outside_root(root, &[pattern]));
    }
    let matcher = GlobBuilder::new(relative)
        .literal_separator(true)
        .build()
        .map_err(|e| ResourceError::Glob(format!("invalid glob {pattern:?}: {e}")))?
        .compile_matcher();

    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.path();
            let relative = path.strip_prefix(root).ok()?;
            let relative = relative.to_string_lossy().replace('\\', "/");
            matcher.is_match(&relative).then_some(relative)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(ResourceError::Glob(format!("{pattern} matched no files")));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::ResourceSet;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = tempfile::Builder::new().prefix("fixture").tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/a.js"), "var a = 1;").unwrap();
        fs::write(dir.path().join("lib/b.js"), "var b = 2;").unwrap();
        fs::write(dir.path().join("lib/c.css"), "p {}").unwrap();
        fs::write(dir.path().join("main.js"), "main();").unwrap();
        dir
    }

    #[test]
    fn test_expand() {
        let dir = fixture();
        assert_eq!(expand(dir.path(), "lib/*.js").unwrap(), vec!["lib/a.js", "lib/b.js"]);
        assert_eq!(expand(dir.path(), "/*.js").unwrap(), vec!["main.js"]);
        assert_eq!(expand(dir.path(), "**/*.css").unwrap(), vec!["lib/c.css"]);
    }

    #[test]
    fn test_expand_no_match() {
        let dir = fixture();
        let err = expand(dir.path(), "*.txt").unwrap_err();
        assert_eq!(err.to_string(), "*.txt matched no files");
    }

    #[test]
    fn test_expand_outside_root() {
        let dir = fixture();
        let err = expand(dir.path(), "../*.js").unwrap_err();
        assert!(err.to_string().starts_with("A path is outside the project root"));
    }

    #[tokio::test]
    async fn test_file_resource() {
        let dir = fixture();
        let set = ResourceSet::new(dir.path());
        let resource = set
            .add(ResourceSpec::new("/app.js").with_file("main.js"))
            .await
            .unwrap();
        assert!(resource.etag().is_some());
        assert_eq!(resource.content().await.unwrap(), "main();");

        fs::write(dir.path().join("main.js"), "changed();").unwrap();
        assert_eq!(resource.content().await.unwrap(), "changed();");
    }

    #[tokio::test]
    async fn test_missing_file_rejects() {
        let dir = fixture();
        let set = ResourceSet::new(dir.path());
        let err = set
            .add(ResourceSpec::new("/x.js").with_file("missing.js"))
            .await
            .unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_file_rejects_on_read() {
        let dir = fixture();
        let set = ResourceSet::new(dir.path());
        let resource = set
            .add(ResourceSpec::new("/main.js").with_file("main.js"))
            .await
            .unwrap();
        fs::remove_file(dir.path().join("main.js")).unwrap();
        assert_eq!(resource.content().await.unwrap_err().code(), "ENOENT");
    }

    #[tokio::test]
    async fn test_add_glob() {
        let dir = fixture();
        let set = ResourceSet::new(dir.path());
        let added = set.add_glob("lib/*.js").await.unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(set.paths(), vec!["/lib/a.js", "/lib/b.js"]);
        let b = set.get("/lib/b.js").unwrap();
        assert_eq!(b.content().await.unwrap(), "var b = 2;");
        assert!(set.add_glob("*.txt").await.is_err());
    }
}
