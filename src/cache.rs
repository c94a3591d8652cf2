use lru::LruCache;
use std::time::{Duration, Instant};

struct CacheEntry<T> {
    bitmap: T,
    last_access: Instant,
}

// Bounded map from image path to a decoded thumbnail. Recency order decides
// capacity eviction, timestamps only drive purge_unused.
pub struct ThumbnailCache<T> {
    entries: LruCache<String, CacheEntry<T>>,
    capacity: usize,
}

impl<T> ThumbnailCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Peek only, no recency or timestamp update
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains(path)
    }

    pub fn get(&mut self, path: &str) -> Option<&T> {
        self.get_at(path, Instant::now())
    }

    pub fn get_at(&mut self, path: &str, now: Instant) -> Option<&T> {
        // get_mut moves the entry to the MRU end
        let entry = self.entries.get_mut(path)?;
        entry.last_access = now;
        Some(&entry.bitmap)
    }

    pub fn put(&mut self, path: &str, bitmap: T) {
        self.put_at(path, bitmap, Instant::now());
    }

    pub fn put_at(&mut self, path: &str, bitmap: T, now: Instant) {
        self.entries.put(
            path.to_owned(),
            CacheEntry {
                bitmap,
                last_access: now,
            },
        );

        // Unbounded LruCache so a zero capacity still works; trim from the LRU end
        while self.entries.len() > self.capacity {
            match self.entries.pop_lru() {
                Some((evicted, _)) => log::debug!("Evicted thumbnail {}", evicted),
                None => break,
            }
        }
    }

    pub fn purge_unused(&mut self, max_age: Duration) -> usize {
        self.purge_unused_at(max_age, Instant::now())
    }

    pub fn purge_unused_at(&mut self, max_age: Duration, now: Instant) -> usize {
        // Age is checked on every entry, not just the LRU tail
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.last_access) > max_age)
            .map(|(path, _)| path.clone())
            .collect();

        // pop removes without touching the order of the survivors
        for path in &stale {
            self.entries.pop(path.as_str());
        }
        if !stale.is_empty() {
            log::debug!("Purged {} idle thumbnails", stale.len());
        }
        stale.len()
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(path, _)| path.as_str()).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
