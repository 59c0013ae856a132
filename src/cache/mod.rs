//! Query cache for catalog reads.
//!
//! Every read endpoint is memoized under a deterministic key derived from
//! the entity, the operation, and the effective query parameters. Writes
//! invalidate the affected single-entity entry; listing entries are never
//! invalidated and simply age out.
//!
//! Configured via the `[cache]` section of `biblio.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 1024
//! ttl_seconds = 60
//! ```

mod keys;
mod store;

pub use keys::CacheKey;
pub use store::{CacheStore, MemoryStore, QueryCache};
