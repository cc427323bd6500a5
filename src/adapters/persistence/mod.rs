//! Persistence adapters: the libsql record store and the local token caches.

pub mod sqlite_store;
pub mod token_cache;

pub use sqlite_store::SqliteStore;
pub use token_cache::{JsonTokenCache, MemoryTokenCache};
