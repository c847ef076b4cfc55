//! Sorted-list entries of an indexed merkle map

use serde::{Deserialize, Serialize};

use crate::errors::{MapError, Result};
use crate::hash::MapHasher;
use crate::types::{Bytes32, MapKey, MapValue, MAX_KEY, MIN_KEY};

/// One entry of the sorted linked list, stored at a fixed tree index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    /// Key of this entry
    pub key: MapKey,
    /// Value stored under the key
    pub value: MapValue,
    /// Next larger included key, or `MAX_KEY`
    pub next_key: MapKey,
    /// Position of the leaf in the tree
    pub index: u64,
}

impl Leaf {
    /// Leaf every map starts with: `(MIN_KEY, 0, MAX_KEY)` at index 0
    pub fn sentinel() -> Self {
        Self { key: MIN_KEY, value: [0u8; 32], next_key: MAX_KEY, index: 0 }
    }

    /// Hashes the leaf with the given hasher
    pub fn hash<H: MapHasher>(&self, hasher: &H) -> Bytes32 {
        hasher.hash_leaf(&self.key, &self.value, &self.next_key)
    }

    /// Returns true if this leaf proves the absence of `key`
    pub fn brackets(&self, key: &MapKey) -> bool { self.key < *key && *key < self.next_key }
}

/// Rejects the sentinel keys as user keys
pub(crate) fn check_key(key: &MapKey) -> Result<()> {
    if *key == MIN_KEY || *key == MAX_KEY {
        return Err(MapError::KeyOutOfRange(*key).into());
    }
    Ok(())
}
