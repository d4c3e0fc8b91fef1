//! The file-backed, per-`(template, data, worker)` answer history that
//! backs cache-aware assignment: deduplicating re-asks within a session
//! while still letting the same binding accumulate distinct historical
//! answers over time.

mod record;
mod store;

pub use record::{CacheFile, CacheRecord, DataListEntry};
pub use store::FileCache;
