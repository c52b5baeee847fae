//! Cross-set resource cache keyed by `(path, etag)`.
//!
//! The cache decouples a resource's identity from its content: a set that
//! only knows a resource's path and etag (an etag-only placeholder) can be
//! inflated with content cached from an earlier set.
//!
//! Entries expire after a TTL, are evicted oldest-first when the cache
//! exceeds its size budget, and can be protected for a while with
//! [`ResourceSetCache::freeze`].
//!
//! `ResourceSetCache` is a cheap clone handle; all clones share one table.

mod table;

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};

use table::{Cached, Table};

use crate::config::CacheConfig;
use crate::debug;
use crate::error::Result;
use crate::resource::Resource;
use crate::set::ResourceSet;

#[derive(Clone)]
pub struct ResourceSetCache(Arc<Shared>);

struct Shared {
    table: Mutex<Table>,
    sweep_interval: Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

impl Default for ResourceSetCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl ResourceSetCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self(Arc::new(Shared {
            table: Mutex::new(Table::new(config.ttl(), config.max_size)),
            sweep_interval: config.sweep_interval(),
            sweeper: Mutex::new(None),
        }))
    }

    /// Expire entries in the background every `sweep_interval`.
    ///
    /// Must be called from within a tokio runtime. The task only holds a
    /// weak reference and stops once the last handle is dropped.
    pub fn spawn_sweeper(&self) {
        let weak: Weak<Shared> = Arc::downgrade(&self.0);
        let interval = self.0.sweep_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                let removed = shared.table.lock().sweep(Instant::now());
                if removed > 0 {
                    debug!("cache"; "swept {} entries", removed);
                }
            }
        });
        if let Some(previous) = self.0.sweeper.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Drop every entry and stop the sweeper.
    pub fn dispose(&self) {
        if let Some(handle) = self.0.sweeper.lock().take() {
            handle.abort();
        }
        self.0.table.lock().clear();
    }

    // ------------------------------------------------------------------------
    // Inflate
    // ------------------------------------------------------------------------

    /// Cache the content of `set`'s etagged resources, then fill in its
    /// etag-only placeholders from the cache.
    ///
    /// Content failures are not reported here: the resource keeps failing
    /// when its content is requested later. Placeholders without a cached
    /// entry are left as they are.
    pub async fn inflate(&self, set: &ResourceSet) {
        let placeholders = self.store(set).await;

        let replacements: Vec<Resource> = {
            let table = self.0.table.lock();
            let now = Instant::now();
            placeholders
                .iter()
                .filter_map(|placeholder| {
                    let etag = placeholder.etag()?;
                    table.get(placeholder.path(), &etag, now)
                })
                .collect()
        };

        debug!(
            "cache";
            "inflated {} of {} placeholders",
            replacements.len(),
            placeholders.len()
        );
        for resource in replacements {
            set.insert(resource);
        }
    }

    /// Cache the content of `set`'s etagged resources.
    pub async fn cache(&self, set: &ResourceSet) {
        self.store(set).await;
    }

    /// Store resolved content; returns the placeholders found along the way.
    async fn store(&self, set: &ResourceSet) -> Vec<Resource> {
        let mut resolved = Vec::new();
        let mut placeholders = Vec::new();

        for resource in set.resources() {
            if !resource.cacheable() || resource.is_backend() {
                continue;
            }
            let Some(etag) = resource.etag() else {
                continue;
            };
            if resource.is_unresolved() {
                placeholders.push(resource);
                continue;
            }
            match snapshot(set, &resource).await {
                Ok(cached) => resolved.push((etag, cached)),
                Err(e) => debug!("cache"; "not caching {}: {}", resource.path(), e),
            }
        }

        let mut table = self.0.table.lock();
        let now = Instant::now();
        table.sweep(now);
        for (etag, cached) in resolved {
            let path = cached.resource.path().to_string();
            table.insert(&path, &etag, cached, now);
        }
        let evicted = table.maintain(now);
        if evicted > 0 {
            debug!("cache"; "evicted {} entries", evicted);
        }
        placeholders
    }

    // ------------------------------------------------------------------------
    // Queries and control
    // ------------------------------------------------------------------------

    /// Cached resource for `(path, etag)`.
    pub fn get(&self, path: &str, etag: &str) -> Option<Resource> {
        self.0.table.lock().get(path, etag, Instant::now())
    }

    /// Live etags grouped by path.
    pub fn resource_versions(&self) -> BTreeMap<String, Vec<String>> {
        self.0.table.lock().versions(Instant::now())
    }

    /// Approximate footprint in bytes: content plus serialized headers.
    pub fn size(&self) -> usize {
        let mut table = self.0.table.lock();
        table.sweep(Instant::now());
        table.size()
    }

    /// Change the size budget; applied on the next mutating operation.
    pub fn set_max_size(&self, max_size: Option<usize>) {
        self.0.table.lock().set_max_size(max_size);
    }

    /// Keep every current entry alive for at least `duration`, and hold back
    /// size eviction and purges until then.
    pub fn freeze(&self, duration: Duration) {
        let until = self.0.table.lock().freeze(duration, Instant::now());
        debug!("cache"; "frozen for {:?}", until.saturating_duration_since(Instant::now()));
    }

    /// Drop every entry. During a freeze, the purge is deferred until the
    /// freeze lapses and `false` is returned.
    pub fn purge_all(&self) -> bool {
        let purged = self.0.table.lock().purge_all(Instant::now());
        if !purged {
            debug!("cache"; "purge deferred until freeze lapses");
        }
        purged
    }
}

/// Resolve `resource` (through its set, for combined resources) into a
/// cacheable snapshot with the same etag.
async fn snapshot(set: &ResourceSet, resource: &Resource) -> Result<Cached> {
    let content = set.resolve_content(resource).await?;

    let mut alternatives = Vec::new();
    let mut copies = Vec::new();
    for alt in resource.alternatives() {
        let alt_content = alt.content().await?;
        alternatives.push((alt.mime_type(), alt_content.clone()));
        copies.push(alt.cached_copy(alt_content, Vec::new()));
    }

    let size = content.len()
        + resource.headers().serialized_len()
        + alternatives.iter().map(|(_, c)| c.len()).sum::<usize>();
    Ok(Cached {
        resource: resource.cached_copy(content.clone(), copies),
        content,
        alternatives,
        size,
    })
}
