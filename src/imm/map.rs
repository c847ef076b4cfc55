//! Full indexed merkle map
//!
//! A merkle tree of height `H` whose leaves form a linked list sorted by key.
//! Leaves are appended in insertion order; the list order lives in each
//! leaf's `next_key`. Index 0 always holds the `(MIN_KEY, 0, MAX_KEY)`
//! sentinel, which is the low leaf of every key smaller than the first
//! included one.

use std::collections::BTreeMap;

use tracing::debug;

use super::leaf::{check_key, Leaf};
use super::proof::{MembershipProof, NonMembershipProof};
use super::tree::NodeLayers;
use super::view::MapView;
use crate::errors::{MapError, Result};
use crate::hash::MapHasher;
use crate::types::{Bytes32, MapKey, MapValue, MAX_TREE_HEIGHT};

/// Authenticated key-value map with membership and non-membership proofs
#[derive(Clone, Debug)]
pub struct IndexedMerkleMap<H: MapHasher> {
    hasher: H,
    tree: NodeLayers,
    leaves: BTreeMap<MapKey, Leaf>,
    by_index: Vec<MapKey>,
}

impl<H: MapHasher> PartialEq for IndexedMerkleMap<H> {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree && self.leaves == other.leaves && self.by_index == other.by_index
    }
}

impl<H: MapHasher> Eq for IndexedMerkleMap<H> {}

impl<H: MapHasher> IndexedMerkleMap<H> {
    /// Creates an empty map holding only the sentinel leaf
    ///
    /// # Arguments
    /// * `height` - Tree height in `1..=MAX_TREE_HEIGHT`; capacity is `2^height` leaves
    /// * `hasher` - Hash function for leaves and nodes
    ///
    /// # Example
    ///
    /// ```rust
    /// use shielded_rollup::hash::Sha256Hasher;
    /// use shielded_rollup::imm::{IndexedMerkleMap, MapView};
    ///
    /// let mut map = IndexedMerkleMap::new(8, Sha256Hasher)?;
    /// map.insert([1u8; 32], [2u8; 32])?;
    ///
    /// assert_eq!(map.assert_included(&[1u8; 32])?, [2u8; 32]);
    /// assert!(map.assert_not_included(&[3u8; 32]).is_ok());
    /// # Ok::<(), shielded_rollup::Error>(())
    /// ```
    pub fn new(height: u8, hasher: H) -> Result<Self> {
        if height == 0 || height > MAX_TREE_HEIGHT {
            return Err(MapError::InvalidHeight { height, max: MAX_TREE_HEIGHT }.into());
        }
        let mut map = Self {
            tree: NodeLayers::new(&hasher, height),
            hasher,
            leaves: BTreeMap::new(),
            by_index: Vec::new(),
        };
        map.append(Leaf::sentinel());
        Ok(map)
    }

    /// Number of leaf slots (`2^height`)
    pub fn capacity(&self) -> u64 { 1u64 << self.tree.height() }

    /// Number of leaf slots still free
    pub fn remaining_capacity(&self) -> u64 { self.capacity() - self.by_index.len() as u64 }

    /// Number of user keys (the sentinel is not counted)
    pub fn len(&self) -> usize { self.leaves.len() - 1 }

    /// Returns true if no user key has been inserted
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Unverified lookup
    pub fn get_option(&self, key: &MapKey) -> Option<MapValue> {
        if check_key(key).is_err() {
            return None;
        }
        self.leaves.get(key).map(|leaf| leaf.value)
    }

    /// Returns true if `key` is included
    pub fn contains(&self, key: &MapKey) -> bool { self.get_option(key).is_some() }

    /// Included leaves in ascending key order, sentinel first
    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> + '_ { self.leaves.values() }

    /// Included `(key, value)` pairs in ascending key order, sentinel excluded
    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &MapValue)> + '_ {
        self.leaves.values().skip(1).map(|leaf| (&leaf.key, &leaf.value))
    }

    /// Inserts a new key
    ///
    /// The new leaf takes the next free index; its predecessor in key order
    /// is relinked to point at it.
    ///
    /// # Errors
    /// `KeyAlreadyIncluded` if the key is present, `CapacityExceeded` if
    /// every slot is in use.
    pub fn insert(&mut self, key: MapKey, value: MapValue) -> Result<()> {
        check_key(&key)?;
        if self.leaves.contains_key(&key) {
            return Err(MapError::KeyAlreadyIncluded(key).into());
        }
        self.reserve(1)?;

        let mut low = *self.low_leaf(&key)?;
        let leaf = Leaf { key, value, next_key: low.next_key, index: self.by_index.len() as u64 };
        low.next_key = key;
        self.write(low);
        self.append(leaf);
        debug!(key = %hex::encode(key), index = leaf.index, "imm insert");
        Ok(())
    }

    /// Replaces the value of an included key and returns the previous value
    pub fn update(&mut self, key: MapKey, value: MapValue) -> Result<MapValue> {
        check_key(&key)?;
        let mut leaf = *self.leaves.get(&key).ok_or(MapError::KeyNotIncluded(key))?;
        let previous = leaf.value;
        leaf.value = value;
        self.write(leaf);
        debug!(key = %hex::encode(key), index = leaf.index, "imm update");
        Ok(previous)
    }

    /// Inserts or updates `key`, returning the previous value if any
    pub fn set(&mut self, key: MapKey, value: MapValue) -> Result<Option<MapValue>> {
        if self.contains(&key) {
            self.update(key, value).map(Some)
        } else {
            self.insert(key, value).map(|_| None)
        }
    }

    /// Upsert gated by `condition`; a false condition touches nothing
    pub fn set_if(
        &mut self,
        condition: bool,
        key: MapKey,
        value: MapValue,
    ) -> Result<Option<MapValue>> {
        if !condition {
            return Ok(None);
        }
        self.set(key, value)
    }

    /// Fails unless `additional` more leaves fit
    pub fn reserve(&self, additional: u64) -> Result<()> {
        if additional > self.remaining_capacity() {
            return Err(MapError::CapacityExceeded {
                height: self.tree.height(),
                capacity: self.capacity(),
            }
            .into());
        }
        Ok(())
    }

    /// Greatest included leaf with key strictly below `key`
    pub(crate) fn low_leaf(&self, key: &MapKey) -> Result<&Leaf> {
        // The sentinel holds MIN_KEY, so a predecessor exists for every valid key
        self.leaves
            .range(..*key)
            .next_back()
            .map(|(_, leaf)| leaf)
            .ok_or_else(|| MapError::KeyOutOfRange(*key).into())
    }

    pub(crate) fn hasher_ref(&self) -> &H { &self.hasher }

    pub(crate) fn tree(&self) -> &NodeLayers { &self.tree }

    pub(crate) fn leaf_at(&self, key: &MapKey) -> Option<&Leaf> { self.leaves.get(key) }

    /// Rebuilds a map from validated parts
    pub(crate) fn from_parts(hasher: H, height: u8, leaves: Vec<Leaf>) -> Result<Self> {
        let mut map = Self {
            tree: NodeLayers::new(&hasher, height),
            hasher,
            leaves: BTreeMap::new(),
            by_index: Vec::with_capacity(leaves.len()),
        };
        let mut ordered = leaves;
        ordered.sort_by_key(|leaf| leaf.index);
        for (position, leaf) in ordered.into_iter().enumerate() {
            if leaf.index != position as u64 {
                return Err(MapError::Malformed(format!(
                    "leaf indices are not a permutation: expected {position}, found {}",
                    leaf.index
                ))
                .into());
            }
            map.append(leaf);
        }
        Ok(map)
    }

    fn append(&mut self, leaf: Leaf) {
        self.by_index.push(leaf.key);
        self.write(leaf);
    }

    fn write(&mut self, leaf: Leaf) {
        let hash = leaf.hash(&self.hasher);
        self.tree.set_leaf(&self.hasher, leaf.index, hash);
        self.leaves.insert(leaf.key, leaf);
    }
}

impl<H: MapHasher> MapView for IndexedMerkleMap<H> {
    type Hasher = H;

    fn hasher(&self) -> &H { &self.hasher }

    fn root(&self) -> Bytes32 { self.tree.root() }

    fn height(&self) -> u8 { self.tree.height() }

    fn leaf_count(&self) -> u64 { self.by_index.len() as u64 }

    fn membership_proof(&self, key: &MapKey) -> Result<MembershipProof> {
        check_key(key)?;
        let leaf = *self.leaves.get(key).ok_or(MapError::KeyNotIncluded(*key))?;
        Ok(MembershipProof { leaf, path: self.tree.path(leaf.index) })
    }

    fn non_membership_proof(&self, key: &MapKey) -> Result<NonMembershipProof> {
        check_key(key)?;
        if self.leaves.contains_key(key) {
            return Err(MapError::KeyAlreadyIncluded(*key).into());
        }
        let low_leaf = *self.low_leaf(key)?;
        Ok(NonMembershipProof { low_leaf, path: self.tree.path(low_leaf.index) })
    }
}
