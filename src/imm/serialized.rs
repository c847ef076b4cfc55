//! Persisted layout of full maps
//!
//! Loading never trusts the stored nodes: the tree is rebuilt from the
//! leaves and every structural invariant is checked before the map is
//! handed out.

use serde::{Deserialize, Serialize};

use super::leaf::Leaf;
use super::map::IndexedMerkleMap;
use super::view::MapView;
use crate::errors::{MapError, Result};
use crate::hash::MapHasher;
use crate::types::{Bytes32, MAX_KEY, MAX_TREE_HEIGHT, MIN_KEY};

/// Serialized form of a full indexed merkle map
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedMap {
    /// Tree height
    pub height: u8,
    /// Map root
    pub root: Bytes32,
    /// Number of used leaf slots, including the sentinel
    pub leaf_count: u64,
    /// Populated nodes of each level, leaf level first, root level last
    pub nodes: Vec<Vec<Bytes32>>,
    /// Sorted-list entries in ascending key order
    pub leaves: Vec<Leaf>,
}

pub(crate) fn check_height(height: u8) -> Result<()> {
    if height == 0 || height > MAX_TREE_HEIGHT {
        return Err(MapError::InvalidHeight { height, max: MAX_TREE_HEIGHT }.into());
    }
    Ok(())
}

fn malformed(message: impl Into<String>) -> crate::errors::Error {
    MapError::Malformed(message.into()).into()
}

impl<H: MapHasher> IndexedMerkleMap<H> {
    /// Serializes the map
    pub fn serialize(&self) -> SerializedMap {
        SerializedMap {
            height: self.height(),
            root: self.root(),
            leaf_count: self.leaf_count(),
            nodes: self.tree().levels().to_vec(),
            leaves: self.leaves().copied().collect(),
        }
    }

    /// Restores a map, rejecting anything that violates a map invariant
    ///
    /// # Errors
    /// `Malformed` if the leaves are unsorted, the sentinel is missing or
    /// misplaced, a `next_key` is not the successor key, the indices are not
    /// `0..leaf_count`, the leaf count exceeds capacity, or the stored nodes
    /// or root differ from the ones rebuilt from the leaves.
    pub fn from_serialized(serialized: SerializedMap, hasher: H) -> Result<Self> {
        let SerializedMap { height, root, leaf_count, nodes, leaves } = serialized;
        check_height(height)?;

        if leaves.len() as u64 != leaf_count {
            return Err(malformed(format!(
                "leaf count {leaf_count} does not match {} leaves",
                leaves.len()
            )));
        }
        if leaf_count > 1u64 << height {
            return Err(malformed(format!("{leaf_count} leaves exceed height {height}")));
        }
        match leaves.first() {
            Some(first) if first.key == MIN_KEY && first.index == 0 => {}
            _ => return Err(malformed("sentinel leaf missing")),
        }
        for pair in leaves.windows(2) {
            if pair[0].key >= pair[1].key {
                return Err(malformed("leaves are not strictly sorted"));
            }
            if pair[0].next_key != pair[1].key {
                return Err(malformed(format!("leaf at index {} is mislinked", pair[0].index)));
            }
        }
        match leaves.last() {
            Some(last) if last.next_key == MAX_KEY && last.key != MAX_KEY => {}
            _ => return Err(malformed("last leaf does not close the list")),
        }

        let map = Self::from_parts(hasher, height, leaves)?;
        if map.tree().levels() != nodes.as_slice() {
            return Err(malformed("stored nodes do not match leaves"));
        }
        if map.root() != root {
            return Err(MapError::RootMismatch(root).into());
        }
        Ok(map)
    }
}
