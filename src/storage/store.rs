//! Expiring Key-Value Store
//!
//! This module implements the single shared data structure of the server: a
//! map from key to value where each value may carry an absolute expiry time.
//!
//! ## Design Decisions
//!
//! 1. **One Mutex**: the whole map sits behind a single `Mutex`. Every
//!    operation holds it for its full duration, which makes each operation
//!    linearizable. Nothing outside this type can reach the map.
//! 2. **Lazy Expiry**: `get` treats an expired entry as absent and removes it
//!    on the spot, so a stale value is never returned.
//! 3. **Active Expiry**: `sweep` removes every expired entry; the
//!    [`Reclaimer`](crate::storage::Reclaimer) calls it on a timer.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ExpiringStore               │
//! │  ┌────────────────────────────────────┐  │
//! │  │ Mutex<HashMap<Bytes, Entry>>       │  │
//! │  └────────────────────────────────────┘  │
//! │     ▲ get / set          ▲ sweep         │
//! └─────┼────────────────────┼───────────────┘
//!   connection tasks     Reclaimer
//! ```

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A stored value with optional expiry time.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored value
    pub value: Bytes,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
    /// When this entry was written. Overwriting a key resets it.
    pub created_at: Instant,
}

impl Entry {
    /// Creates an entry written at `now`. A `None` TTL never expires.
    pub fn new(value: Bytes, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| now + ttl),
            created_at: now,
        }
    }

    /// Checks whether this entry is expired as of `now`.
    ///
    /// An entry is visible in `[created_at, expires_at)`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// The expiring key-value store.
///
/// Designed to be wrapped in an `Arc` and shared by every connection task and
/// the reclamation loop.
///
/// # Example
///
/// ```
/// use emberkv::storage::ExpiringStore;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let store = ExpiringStore::new();
///
/// store.set(Bytes::from("name"), Bytes::from("ember"), None);
/// assert_eq!(store.get(b"name"), Some(Bytes::from("ember")));
///
/// store.set(Bytes::from("session"), Bytes::from("abc"), Some(Duration::from_secs(60)));
/// assert!(store.get(b"session").is_some());
/// ```
#[derive(Default)]
pub struct ExpiringStore {
    entries: Mutex<HashMap<Bytes, Entry>>,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: total SET operations
    set_count: AtomicU64,

    /// Statistics: entries removed because they expired (lazily or by sweep)
    expired_count: AtomicU64,
}

impl std::fmt::Debug for ExpiringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("keys", &self.len())
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl ExpiringStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the map.
    ///
    /// Every critical section leaves the map consistent, so a poisoned lock
    /// is safe to keep using.
    fn lock(&self) -> MutexGuard<'_, HashMap<Bytes, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or overwrites `key`.
    ///
    /// `ttl = None` means the entry never expires. Overwriting discards the
    /// previous entry entirely, including its expiry countdown.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>) {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.lock();
        entries.insert(key, Entry::new(value, ttl, Instant::now()));
    }

    /// Returns the value for `key` if it exists and has not expired.
    ///
    /// Missing and expired keys are indistinguishable. An expired entry found
    /// here is removed immediately.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.lock();
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }

        entries.remove(key);
        self.expired_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Removes every entry that is expired as of the call.
    ///
    /// Returns the number of entries removed. Calling it again with no
    /// intervening `set` removes nothing further.
    pub fn sweep(&self) -> usize {
        let mut entries = self.lock();
        let now = Instant::now();

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - entries.len();

        if removed > 0 {
            self.expired_count
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Number of physically stored entries, including expired entries that
    /// have not been reclaimed yet.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns operation counters.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len(),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of entries currently stored
    pub keys: usize,
    /// Total GET operations
    pub get_ops: u64,
    /// Total SET operations
    pub set_ops: u64,
    /// Total expired entries removed
    pub expired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_and_get() {
        let store = ExpiringStore::new();

        store.set(Bytes::from("key"), Bytes::from("value"), None);
        assert_eq!(store.get(b"key"), Some(Bytes::from("value")));
    }

    #[test]
    fn test_get_nonexistent() {
        let store = ExpiringStore::new();
        assert_eq!(store.get(b"nonexistent"), None);
    }

    #[test]
    fn test_overwrite() {
        let store = ExpiringStore::new();

        store.set(Bytes::from("key"), Bytes::from("v1"), None);
        store.set(Bytes::from("key"), Bytes::from("v2"), None);
        assert_eq!(store.get(b"key"), Some(Bytes::from("v2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_expiry_window() {
        let store = ExpiringStore::new();

        store.set(
            Bytes::from("temp"),
            Bytes::from("value"),
            Some(Duration::from_millis(100)),
        );
        assert_eq!(store.get(b"temp"), Some(Bytes::from("value")));

        thread::sleep(Duration::from_millis(150));

        assert_eq!(store.get(b"temp"), None);
        // Lazy expiry removed it
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let now = Instant::now();
        let entry = Entry::new(Bytes::from("v"), Some(Duration::from_millis(10)), now);

        assert!(!entry.is_expired_at(now));
        assert!(!entry.is_expired_at(now + Duration::from_millis(9)));
        assert!(entry.is_expired_at(now + Duration::from_millis(10)));

        let forever = Entry::new(Bytes::from("v"), None, now);
        assert!(!forever.is_expired_at(now + Duration::from_secs(3600)));
    }

    #[test]
    fn test_overwrite_resets_lifetime() {
        let store = ExpiringStore::new();
        let ttl = Some(Duration::from_millis(100));

        store.set(Bytes::from("k"), Bytes::from("v1"), ttl);
        thread::sleep(Duration::from_millis(80));
        store.set(Bytes::from("k"), Bytes::from("v2"), ttl);
        thread::sleep(Duration::from_millis(40));

        // 120ms after the first set, 40ms after the second
        assert_eq!(store.get(b"k"), Some(Bytes::from("v2")));
    }

    #[test]
    fn test_overwrite_without_ttl_clears_expiry() {
        let store = ExpiringStore::new();

        store.set(Bytes::from("k"), Bytes::from("v1"), Some(Duration::from_millis(20)));
        store.set(Bytes::from("k"), Bytes::from("v2"), None);
        thread::sleep(Duration::from_millis(50));

        assert_eq!(store.get(b"k"), Some(Bytes::from("v2")));
        assert_eq!(store.sweep(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_no_ttl_persists() {
        let store = ExpiringStore::new();

        store.set(Bytes::from("k"), Bytes::from("v"), None);
        thread::sleep(Duration::from_millis(200));
        assert_eq!(store.sweep(), 0);
        assert_eq!(store.get(b"k"), Some(Bytes::from("v")));
    }

    #[test]
    fn test_sweep() {
        let store = ExpiringStore::new();

        for i in 0..10 {
            store.set(
                Bytes::from(format!("temp{}", i)),
                Bytes::from("value"),
                Some(Duration::from_millis(20)),
            );
        }
        store.set(Bytes::from("persistent"), Bytes::from("value"), None);
        assert_eq!(store.len(), 11);

        thread::sleep(Duration::from_millis(50));

        assert_eq!(store.sweep(), 10);
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().expired, 10);
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let store = ExpiringStore::new();

        store.set(Bytes::from("a"), Bytes::from("1"), Some(Duration::from_millis(10)));
        store.set(Bytes::from("b"), Bytes::from("2"), Some(Duration::from_secs(60)));
        store.set(Bytes::from("c"), Bytes::from("3"), None);
        thread::sleep(Duration::from_millis(30));

        assert_eq!(store.sweep(), 1);
        let after_first = store.len();
        assert_eq!(store.sweep(), 0);
        assert_eq!(store.len(), after_first);
        assert_eq!(store.get(b"b"), Some(Bytes::from("2")));
        assert_eq!(store.get(b"c"), Some(Bytes::from("3")));
    }

    #[test]
    fn test_stats() {
        let store = ExpiringStore::new();

        store.set(Bytes::from("k"), Bytes::from("v"), None);
        store.get(b"k");
        store.get(b"missing");

        let stats = store.stats();
        assert_eq!(stats.keys, 1);
        assert_eq!(stats.set_ops, 1);
        assert_eq!(stats.get_ops, 2);
        assert_eq!(stats.expired, 0);
    }

    #[test]
    fn test_concurrent_access() {
        let store = Arc::new(ExpiringStore::new());
        let mut handles = vec![];

        // A sweeper hammering the lock while writers run
        let sweeper = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..200 {
                    store.sweep();
                }
            })
        };

        for t in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..500 {
                    let key = Bytes::from(format!("t{}:k{}", t, i));
                    let value = Bytes::from(format!("v{}", i));
                    store.set(key.clone(), value.clone(), Some(Duration::from_secs(60)));
                    assert_eq!(store.get(&key), Some(value));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        sweeper.join().unwrap();

        assert_eq!(store.len(), 8 * 500);
    }
}
