//! Resource sets: ordered, path-addressed collections of resources.
//!
//! A set owns its resources, a load path (the ordered subset of paths a
//! client should load), a root path for file resources and a context path
//! it is served under.
//!
//! `ResourceSet` is a cheap clone handle. Mutations that touch the
//! filesystem are async; [`ResourceSet::serialize`] waits for all of them
//! before reading the set.

mod files;
mod load;
mod wire;

pub use wire::SetData;

use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;

use indexmap::IndexMap;

use crate::debug;
use crate::error::{ResourceError, Result};
use crate::resource::{Processor, Resource, ResourceSpec};
use crate::utils::path::normalize_path;

type ResourceMap = IndexMap<String, Resource, FxBuildHasher>;

#[derive(Clone)]
pub struct ResourceSet(Arc<Shared>);

struct Shared {
    state: RwLock<State>,
    /// Number of additions still in flight.
    pending: watch::Sender<usize>,
}

struct State {
    resources: ResourceMap,
    load_path: Vec<String>,
    root_path: PathBuf,
    context_path: String,
}

/// Keeps the pending counter raised for the duration of an addition.
struct PendingGuard<'a>(&'a watch::Sender<usize>);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl Default for ResourceSet {
    fn default() -> Self {
        Self::new(".")
    }
}

impl std::fmt::Debug for ResourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.0.state.read();
        f.debug_struct("ResourceSet")
            .field("root_path", &state.root_path)
            .field("context_path", &state.context_path)
            .field("resources", &state.resources.keys().collect::<Vec<_>>())
            .field("load_path", &state.load_path)
            .finish()
    }
}

impl ResourceSet {
    /// Empty set resolving file resources relative to `root_path`.
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        let (pending, _) = watch::channel(0);
        Self(Arc::new(Shared {
            state: RwLock::new(State {
                resources: ResourceMap::default(),
                load_path: Vec::new(),
                root_path: root_path.into(),
                context_path: String::new(),
            }),
            pending,
        }))
    }

    pub fn with_context_path(self, context_path: &str) -> Self {
        self.set_context_path(context_path);
        self
    }

    pub fn root_path(&self) -> PathBuf {
        self.0.state.read().root_path.clone()
    }

    pub fn context_path(&self) -> String {
        self.0.state.read().context_path.clone()
    }

    /// Prefix every served path of this set with `context_path`.
    pub fn set_context_path(&self, context_path: &str) {
        let context_path = context_path.trim_end_matches('/');
        self.0.state.write().context_path = if context_path.is_empty() {
            String::new()
        } else {
            normalize_path(context_path)
        };
    }

    pub fn ptr_eq(&self, other: &ResourceSet) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // ------------------------------------------------------------------------
    // Adding and removing
    // ------------------------------------------------------------------------

    fn pending(&self) -> PendingGuard<'_> {
        self.0.pending.send_modify(|n| *n += 1);
        PendingGuard(&self.0.pending)
    }

    /// Wait until no addition is in flight.
    pub async fn settled(&self) {
        let mut rx = self.0.pending.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Validate `spec`, resolve file and combine origins, and store the
    /// resource. An existing resource at the same path is replaced in place.
    pub async fn add(&self, mut spec: ResourceSpec) -> Result<Resource> {
        let _pending = self.pending();
        spec.validate_origins()?;

        if let Some(file) = spec.file.take() {
            spec = files::prepare(&self.root_path(), &file, spec).await?;
        }
        if let Some(sources) = &spec.combine {
            let path = normalize_path(spec.path.as_deref().unwrap_or_default());
            self.validate_sources(&path, sources)?;
        }

        let resource = Resource::create(spec)?;
        self.insert(resource.clone());
        Ok(resource)
    }

    /// Add every file under the root matching `pattern` as a file resource.
    ///
    /// Matching no files is an error.
    pub async fn add_glob(&self, pattern: &str) -> Result<Vec<Resource>> {
        let _pending = self.pending();
        let root = self.root_path();
        let owned = pattern.to_string();
        let matched = tokio::task::spawn_blocking(move || files::expand(&root, &owned))
            .await
            .map_err(|e| ResourceError::Glob(format!("{pattern}: {e}")))??;

        let mut added = Vec::with_capacity(matched.len());
        for relative in matched {
            let spec = ResourceSpec::new(format!("/{relative}")).with_file(relative);
            added.push(self.add(spec).await?);
        }
        debug!("set"; "{} matched {} files", pattern, added.len());
        Ok(added)
    }

    /// Store a prebuilt resource, replacing any resource at the same path.
    pub fn insert(&self, resource: Resource) {
        self.0
            .state
            .write()
            .resources
            .insert(resource.path().to_string(), resource);
    }

    fn validate_sources(&self, path: &str, sources: &[String]) -> Result<()> {
        let state = self.0.state.read();
        for source in sources {
            if !state.resources.contains_key(&normalize_path(source)) {
                return Err(ResourceError::invalid(format!(
                    "Cannot build combined resource {path}: {source} is not an available resource"
                )));
            }
        }
        Ok(())
    }

    /// Remove the resource at `path`, also dropping it from the load path.
    pub fn remove(&self, path: &str) -> Option<Resource> {
        let path = normalize_path(path);
        let mut state = self.0.state.write();
        let removed = state.resources.shift_remove(&path);
        state.load_path.retain(|p| *p != path);
        removed
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub fn get(&self, path: &str) -> Option<Resource> {
        self.0.state.read().resources.get(&normalize_path(path)).cloned()
    }

    /// Resources in insertion order.
    pub fn resources(&self) -> Vec<Resource> {
        self.0.state.read().resources.values().cloned().collect()
    }

    pub fn paths(&self) -> Vec<String> {
        self.0.state.read().resources.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.state.read().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resource answering `path`: an exact match, else the first backend
    /// whose path prefixes it.
    pub fn find_responder(&self, path: &str) -> Option<Resource> {
        let path = normalize_path(path);
        let state = self.0.state.read();
        if let Some(resource) = state.resources.get(&path) {
            return Some(resource.clone());
        }
        state
            .resources
            .values()
            .find(|r| r.is_backend() && r.responds_to(&path))
            .cloned()
    }

    // ------------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------------

    /// Register `processor` on every resource currently in the set.
    pub fn add_processor(&self, processor: Processor) {
        for resource in self.resources() {
            resource.add_processor(processor.clone());
        }
    }

    /// Resolve content, concatenating combined resources from their sources
    /// in declared order.
    pub async fn resolve_content(&self, resource: &Resource) -> Result<String> {
        self.resolve(resource.clone(), Vec::new()).await
    }

    fn resolve(
        &self,
        resource: Resource,
        mut stack: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async move {
            let Some(sources) = resource.combine().map(<[String]>::to_vec) else {
                return resource.content().await;
            };
            let path = resource.path().to_string();
            if stack.contains(&path) {
                return Err(ResourceError::Combine {
                    path,
                    message: "combined resources form a cycle".to_string(),
                });
            }
            stack.push(path);

            let mut combined = String::new();
            for source in sources {
                let Some(part) = self.get(&source) else {
                    return Err(ResourceError::Combine {
                        path: resource.path().to_string(),
                        message: format!("{source} is not an available resource"),
                    });
                };
                combined.push_str(&self.resolve(part, stack.clone()).await?);
            }
            resource.process(combined)
        })
    }

    // ------------------------------------------------------------------------
    // Merging
    // ------------------------------------------------------------------------

    /// New set holding this set's resources followed by each of `others`.
    ///
    /// Later sets win on path collisions. The receiver's root and context
    /// path carry over; load paths are concatenated without duplicates.
    pub fn concat(&self, others: &[&ResourceSet]) -> ResourceSet {
        let merged = ResourceSet::new(self.root_path());
        merged.0.state.write().context_path = self.context_path();

        for set in std::iter::once(self).chain(others.iter().copied()) {
            let (resources, load_path) = {
                let state = set.0.state.read();
                (
                    state.resources.values().cloned().collect::<Vec<_>>(),
                    state.load_path.clone(),
                )
            };
            let mut state = merged.0.state.write();
            for resource in resources {
                state.resources.insert(resource.path().to_string(), resource);
            }
            for path in load_path {
                if !state.load_path.contains(&path) {
                    state.load_path.push(path);
                }
            }
        }
        merged
    }
}

/// Root path for a set loaded from `config_dir`.
pub fn resolve_root(config_dir: &Path, root: &Path) -> PathBuf {
    if root.is_absolute() {
        root.to_path_buf()
    } else {
        config_dir.join(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Body, ContentFn};

    async fn set_with(paths: &[(&str, &str)]) -> ResourceSet {
        let set = ResourceSet::default();
        for (path, content) in paths {
            set.add(ResourceSpec::new(*path).with_content(*content))
                .await
                .unwrap();
        }
        set
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let set = set_with(&[("/foo.js", "var a;")]).await;
        assert!(set.get("foo.js").is_some());
        assert!(set.get("/foo.js/").is_some());
        assert!(set.get("/bar.js").is_none());
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_spec() {
        let set = ResourceSet::default();
        let err = set
            .add(ResourceSpec::new("/a.js").with_content("x").with_combine(["/b.js"]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID");
        assert!(set.add(ResourceSpec::new("/a.js")).await.is_err());
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_keeps_position() {
        let set = set_with(&[("/a.js", "1"), ("/b.js", "2")]).await;
        set.add(ResourceSpec::new("/a.js").with_content("3"))
            .await
            .unwrap();
        assert_eq!(set.paths(), vec!["/a.js", "/b.js"]);
        let a = set.get("/a.js").unwrap();
        assert_eq!(set.resolve_content(&a).await.unwrap(), "3");
    }

    #[tokio::test]
    async fn test_remove_closes_gaps_and_unloads() {
        let set = set_with(&[("/a.js", "1"), ("/b.js", "2"), ("/c.js", "3")]).await;
        set.append_to_load(["/a.js", "/b.js"]).unwrap();
        assert!(set.remove("/b.js").is_some());
        assert_eq!(set.paths(), vec!["/a.js", "/c.js"]);
        assert_eq!(set.load_path(), vec!["/a.js"]);
        assert!(set.remove("/b.js").is_none());
    }

    #[tokio::test]
    async fn test_combine_requires_sources() {
        let set = set_with(&[("/a.js", "a")]).await;
        let err = set
            .add(ResourceSpec::new("/all.js").with_combine(["/a.js", "/b.js"]))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot build combined resource /all.js: /b.js is not an available resource"
        );
    }

    #[tokio::test]
    async fn test_combine_concatenates_in_order() {
        let set = set_with(&[("/a.js", "a"), ("/b.js", "b")]).await;
        set.add(
            ResourceSpec::new("/slow.js").with_content_fn(ContentFn::deferred(|_| async {
                tokio::task::yield_now().await;
                Ok(Body::from("slow"))
            })),
        )
        .await
        .unwrap();
        let all = set
            .add(ResourceSpec::new("/all.js").with_combine(["/slow.js", "/b.js", "/a.js"]))
            .await
            .unwrap();
        assert_eq!(set.resolve_content(&all).await.unwrap(), "slowba");
    }

    #[tokio::test]
    async fn test_combine_of_combine() {
        let set = set_with(&[("/a.js", "a"), ("/b.js", "b")]).await;
        set.add(ResourceSpec::new("/ab.js").with_combine(["/a.js", "/b.js"]))
            .await
            .unwrap();
        let outer = set
            .add(ResourceSpec::new("/abab.js").with_combine(["/ab.js", "/ab.js"]))
            .await
            .unwrap();
        assert_eq!(set.resolve_content(&outer).await.unwrap(), "abab");
    }

    #[tokio::test]
    async fn test_combine_source_removed_later() {
        let set = set_with(&[("/a.js", "a")]).await;
        let all = set
            .add(ResourceSpec::new("/all.js").with_combine(["/a.js"]))
            .await
            .unwrap();
        set.remove("/a.js");
        let err = set.resolve_content(&all).await.unwrap_err();
        assert_eq!(err.code(), "COMBINE");
    }

    #[tokio::test]
    async fn test_set_processor_applies_to_all() {
        let set = set_with(&[("/a.js", "a"), ("/b.js", "b")]).await;
        set.add_processor(Processor::new("bang", |_, c| Ok(Some(format!("{c}!")))));
        for resource in set.resources() {
            assert!(set.resolve_content(&resource).await.unwrap().ends_with('!'));
        }
    }

    #[tokio::test]
    async fn test_find_responder_prefers_exact() {
        let set = set_with(&[("/api/docs", "docs")]).await;
        set.add(ResourceSpec::new("/api").with_backend("localhost:8080"))
            .await
            .unwrap();
        assert!(!set.find_responder("/api/docs").unwrap().is_backend());
        assert!(set.find_responder("/api/users").unwrap().is_backend());
        assert!(set.find_responder("/other").is_none());
    }

    #[tokio::test]
    async fn test_concat() {
        let first = set_with(&[("/a.js", "a1"), ("/b.js", "b")]).await;
        first.append_to_load(["/a.js"]).unwrap();
        let second = ResourceSet::new("/elsewhere");
        second
            .add(ResourceSpec::new("/a.js").with_content("a2"))
            .await
            .unwrap();
        second
            .add(ResourceSpec::new("/c.js").with_content("c"))
            .await
            .unwrap();
        second.append_to_load(["/c.js", "/a.js"]).unwrap();

        let merged = first.concat(&[&second]);
        assert_eq!(merged.root_path(), PathBuf::from("."));
        assert_eq!(merged.paths(), vec!["/a.js", "/b.js", "/c.js"]);
        assert_eq!(merged.load_path(), vec!["/a.js", "/c.js"]);
        let a = merged.get("/a.js").unwrap();
        assert_eq!(merged.resolve_content(&a).await.unwrap(), "a2");
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_context_path_normalized() {
        let set = ResourceSet::default().with_context_path("app/");
        assert_eq!(set.context_path(), "/app");
        set.set_context_path("/");
        assert_eq!(set.context_path(), "");
    }
}
