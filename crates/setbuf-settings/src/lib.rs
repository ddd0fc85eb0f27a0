//! setbuf Settings - deferred write-back settings store
//!
//! A `Settings` session keeps an in-memory index of category-scoped
//! key/value pairs. Reads load whole categories lazily through the cache,
//! falling back to the backing store. Writes land in the index immediately
//! and in a write buffer that is applied to the store, and reconciled with
//! the cache, only when the session is flushed.
//!
//! ```no_run
//! use std::sync::Arc;
//! use setbuf_cache::MemoryCache;
//! use setbuf_common::SettingsConfig;
//! use setbuf_settings::SettingsBackend;
//! use setbuf_store::MemoryStore;
//!
//! let backend = SettingsBackend::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemoryCache::new()),
//!     SettingsConfig::default(),
//! )?;
//!
//! let mut settings = backend.session();
//! settings.set("system", "theme", "dark");
//! settings.flush().into_result()?;
//! # Ok::<(), setbuf_settings::SettingsError>(())
//! ```

pub mod backend;
pub mod buffer;
pub mod error;
pub mod flush;
pub mod index;
pub mod registry;
pub mod settings;

#[cfg(test)]
mod test_support;

pub use backend::SettingsBackend;
pub use buffer::{PendingWrites, WriteBuffer};
pub use error::{SettingsError, SettingsResult};
pub use flush::{CategoryFailure, FlushCoordinator, FlushReport, RegistryAction};
pub use index::SettingsIndex;
pub use registry::{CacheRegistry, RegistryChange};
pub use settings::{KeyQuery, Settings};
