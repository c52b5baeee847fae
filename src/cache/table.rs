//! Entry table behind the cache.
//!
//! Every operation takes `now` explicitly; the table itself never reads a
//! clock. Entries keep insertion order, which is also eviction order.
//!
//! Policy summary:
//! - TTL expiry (`now >= kill_at`) always applies.
//! - While frozen (`now < freeze_until`), size eviction and purges are held
//!   back; a purge requested during a freeze is recorded and applied to the
//!   entries that existed at that moment once the freeze lapses.

use indexmap::IndexMap;
use std::collections::BTreeMap;
use tokio::time::{Duration, Instant};

use crate::resource::Resource;

type Key = (String, String);

/// Resolved resource ready to be stored.
pub(super) struct Cached {
    pub resource: Resource,
    pub content: String,
    /// `(mime type, content)` per alternative.
    pub alternatives: Vec<(String, String)>,
    pub size: usize,
}

impl Cached {
    fn same_content(&self, other: &Cached) -> bool {
        self.content == other.content && self.alternatives == other.alternatives
    }
}

struct Entry {
    cached: Cached,
    kill_at: Option<Instant>,
    seq: u64,
}

pub(super) struct Table {
    entries: IndexMap<Key, Entry>,
    size: usize,
    next_seq: u64,
    ttl: Option<Duration>,
    max_size: Option<usize>,
    freeze_until: Option<Instant>,
    /// Pending purge: entries inserted before this sequence number.
    purge_before: Option<u64>,
}

impl Table {
    pub fn new(ttl: Option<Duration>, max_size: Option<usize>) -> Self {
        Self {
            entries: IndexMap::new(),
            size: 0,
            next_seq: 0,
            ttl,
            max_size,
            freeze_until: None,
            purge_before: None,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn set_max_size(&mut self, max_size: Option<usize>) {
        self.max_size = max_size;
    }

    pub fn is_frozen(&self, now: Instant) -> bool {
        self.freeze_until.is_some_and(|until| now < until)
    }

    /// Store `cached` under `(path, etag)`.
    ///
    /// Identical content for an existing key is a no-op that keeps the
    /// entry's expiry. Returns whether anything was stored.
    pub fn insert(&mut self, path: &str, etag: &str, cached: Cached, now: Instant) -> bool {
        let key = (path.to_string(), etag.to_string());
        if let Some(existing) = self.entries.get(&key) {
            if existing.cached.same_content(&cached) {
                return false;
            }
            self.remove(&key);
        }

        self.size += cached.size;
        let entry = Entry {
            cached,
            kill_at: self.ttl.map(|ttl| now + ttl),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(key, entry);
        true
    }

    pub fn get(&self, path: &str, etag: &str, now: Instant) -> Option<Resource> {
        let entry = self.entries.get(&(path.to_string(), etag.to_string()))?;
        self.is_live(entry, now)
            .then(|| entry.cached.resource.clone())
    }

    /// Not expired, and not covered by a deferred purge whose freeze lapsed.
    fn is_live(&self, entry: &Entry, now: Instant) -> bool {
        if entry.kill_at.is_some_and(|kill_at| now >= kill_at) {
            return false;
        }
        match self.purge_before {
            Some(before) if !self.is_frozen(now) => entry.seq >= before,
            _ => true,
        }
    }

    fn remove(&mut self, key: &Key) -> Option<Entry> {
        let entry = self.entries.shift_remove(key)?;
        self.size -= entry.cached.size;
        Some(entry)
    }

    fn remove_where(&mut self, mut purge: impl FnMut(&Entry) -> bool) -> usize {
        let before = self.entries.len();
        let mut freed = 0;
        self.entries.retain(|_, entry| {
            let keep = !purge(entry);
            if !keep {
                freed += entry.cached.size;
            }
            keep
        });
        self.size -= freed;
        before - self.entries.len()
    }

    /// Drop expired entries.
    pub fn expire(&mut self, now: Instant) -> usize {
        self.remove_where(|entry| entry.kill_at.is_some_and(|kill_at| now >= kill_at))
    }

    /// Background work: expiry, plus any purge deferred by a freeze that has
    /// since lapsed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let mut removed = self.expire(now);
        if !self.is_frozen(now) {
            self.freeze_until = None;
            if let Some(before) = self.purge_before.take() {
                removed += self.remove_where(|entry| entry.seq < before);
            }
        }
        removed
    }

    /// Full maintenance after a mutation: sweep, then evict oldest entries
    /// until the size budget holds (unless frozen).
    pub fn maintain(&mut self, now: Instant) -> usize {
        let mut removed = self.sweep(now);
        if self.is_frozen(now) {
            return removed;
        }
        if let Some(max_size) = self.max_size {
            while self.size > max_size {
                let Some((_, entry)) = self.entries.shift_remove_index(0) else {
                    break;
                };
                self.size -= entry.cached.size;
                removed += 1;
            }
        }
        removed
    }

    /// Keep every live entry alive until at least `now + duration`.
    pub fn freeze(&mut self, duration: Duration, now: Instant) -> Instant {
        // Lapsed entries stay dead.
        self.sweep(now);
        let until = now + duration;
        let until = self.freeze_until.map_or(until, |current| current.max(until));
        self.freeze_until = Some(until);
        for entry in self.entries.values_mut() {
            if let Some(kill_at) = entry.kill_at.as_mut() {
                *kill_at = (*kill_at).max(until);
            }
        }
        until
    }

    /// Drop everything, or defer until the freeze lapses. Returns whether
    /// the purge happened now.
    pub fn purge_all(&mut self, now: Instant) -> bool {
        if self.is_frozen(now) {
            self.purge_before = Some(self.next_seq);
            return false;
        }
        self.clear();
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.size = 0;
        self.purge_before = None;
    }

    /// Live `(path, [etag])` pairs, in insertion order per path.
    pub fn versions(&self, now: Instant) -> BTreeMap<String, Vec<String>> {
        let mut versions: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for ((path, etag), entry) in &self.entries {
            if !self.is_live(entry, now) {
                continue;
            }
            versions.entry(path.clone()).or_default().push(etag.clone());
        }
        versions
    }

    #[cfg(test)]
    fn kill_at(&self, path: &str, etag: &str) -> Option<Instant> {
        self.entries
            .get(&(path.to_string(), etag.to_string()))
            .and_then(|entry| entry.kill_at)
    }
}
