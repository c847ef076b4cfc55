//! Storage abstraction for serialized maps
//!
//! [`MapStore`] lets the orchestrator persist sub-maps between blocks with
//! any backend. [`InMemoryStore`] keeps JSON bytes; [`CachedStore`] wraps any
//! store with a sharded concurrent cache (quick-cache, S3-FIFO eviction).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use quick_cache::sync::Cache;
use tracing::debug;

use super::map::IndexedMerkleMap;
use super::serialized::SerializedMap;
use crate::errors::{MapError, Result};
use crate::hash::MapHasher;

/// Backend storing serialized maps by name
pub trait MapStore: Send + Sync {
    /// Loads a map
    ///
    /// # Returns
    /// `Ok(Some(map))` if found, `Ok(None)` if not found, or error
    fn load(&self, name: &str) -> Result<Option<SerializedMap>>;

    /// Stores a map, replacing any previous version
    fn save(&self, name: &str, map: &SerializedMap) -> Result<()>;
}

/// In-memory store holding JSON-encoded maps
#[derive(Debug, Default)]
pub struct InMemoryStore {
    maps: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    /// Creates an empty store
    pub fn new() -> Self { Self::default() }
}

fn storage(err: impl std::fmt::Display) -> crate::errors::Error {
    MapError::Storage(err.to_string()).into()
}

impl MapStore for InMemoryStore {
    fn load(&self, name: &str) -> Result<Option<SerializedMap>> {
        let maps = self.maps.read().map_err(storage)?;
        maps.get(name).map(|bytes| serde_json::from_slice(bytes).map_err(storage)).transpose()
    }

    fn save(&self, name: &str, map: &SerializedMap) -> Result<()> {
        let bytes = serde_json::to_vec(map).map_err(storage)?;
        self.maps.write().map_err(storage)?.insert(name.to_string(), bytes);
        Ok(())
    }
}

/// Cached map store
///
/// Wraps another store with a concurrent cache of decoded maps. Saves write
/// through and invalidate the cached entry.
pub struct CachedStore<S> {
    store: S,
    cache: Arc<Cache<String, SerializedMap>>,
}

impl<S> CachedStore<S> {
    /// Creates a new cached store
    ///
    /// # Arguments
    /// * `store` - The underlying store to wrap
    /// * `capacity` - Maximum number of cached maps (approximately)
    pub fn new(store: S, capacity: usize) -> Self {
        Self { store, cache: Arc::new(Cache::new(capacity.max(1))) }
    }

    /// Clears the cache
    pub fn clear_cache(&self) { self.cache.clear(); }

    /// Number of cached maps
    pub fn cached(&self) -> usize { self.cache.len() }
}

impl<S: MapStore> MapStore for CachedStore<S> {
    fn load(&self, name: &str) -> Result<Option<SerializedMap>> {
        if let Some(map) = self.cache.get(name) {
            return Ok(Some(map));
        }
        let loaded = self.store.load(name)?;
        if let Some(map) = &loaded {
            self.cache.insert(name.to_string(), map.clone());
        }
        Ok(loaded)
    }

    fn save(&self, name: &str, map: &SerializedMap) -> Result<()> {
        self.store.save(name, map)?;
        self.cache.remove(name);
        Ok(())
    }
}

impl<H: MapHasher> IndexedMerkleMap<H> {
    /// Persists the map under `name`
    pub fn save_to<S: MapStore + ?Sized>(&self, store: &S, name: &str) -> Result<()> {
        store.save(name, &self.serialize())?;
        debug!(name, "map saved");
        Ok(())
    }

    /// Loads and validates the map stored under `name`
    pub fn load_from<S: MapStore + ?Sized>(
        store: &S,
        name: &str,
        hasher: H,
    ) -> Result<Option<Self>> {
        store.load(name)?.map(|serialized| Self::from_serialized(serialized, hasher)).transpose()
    }
}
