//! Storage Module
//!
//! The expiring key-value store and the background task that reclaims
//! expired entries.
//!
//! ```text
//! ┌─────────────────────────────────┐
//! │          ExpiringStore          │
//! │   Mutex<HashMap<Bytes, Entry>>  │
//! └─────────────────────────────────┘
//!                 ▲
//!                 │ sweep() every interval
//!   ┌─────────────┴─────────────┐
//!   │         Reclaimer         │
//!   │  (Background Tokio Task)  │
//!   └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use emberkv::storage::ExpiringStore;
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let store = ExpiringStore::new();
//! store.set(Bytes::from("token"), Bytes::from("abc"), Some(Duration::from_secs(30)));
//! assert_eq!(store.get(b"token"), Some(Bytes::from("abc")));
//! assert_eq!(store.sweep(), 0);
//! ```

pub mod reclaim;
pub mod store;

pub use reclaim::{ReclaimConfig, Reclaimer};
pub use store::{Entry, ExpiringStore, StorageStats};
