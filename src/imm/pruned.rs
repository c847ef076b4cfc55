//! Witness compaction
//!
//! A pruned map keeps only the leaves and sibling nodes needed to answer a
//! fixed set of inclusion and exclusion queries. It reproduces the full
//! map's root and answers for the requested keys, and rejects every write.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::leaf::{check_key, Leaf};
use super::map::IndexedMerkleMap;
use super::proof::{MembershipProof, NonMembershipProof};
use super::serialized::check_height;
use super::tree::{compute_root_from_path, populated, zero_hashes};
use super::view::MapView;
use crate::errors::{MapError, Result};
use crate::hash::MapHasher;
use crate::types::{Bytes32, MapKey, MapValue, MIN_KEY};

/// Keys a pruned map must be able to answer for
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneRequest {
    /// Keys whose inclusion will be asserted
    pub included: Vec<MapKey>,
    /// Keys whose exclusion will be asserted
    pub excluded: Vec<MapKey>,
}

impl PruneRequest {
    /// Creates an empty request
    pub fn new() -> Self { Self::default() }

    /// Adds a key whose inclusion will be asserted
    pub fn include(mut self, key: MapKey) -> Self {
        self.included.push(key);
        self
    }

    /// Adds a key whose exclusion will be asserted
    pub fn exclude(mut self, key: MapKey) -> Self {
        self.excluded.push(key);
        self
    }
}

/// Size of a pruned map relative to its source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneStats {
    /// Nodes stored by the full map
    pub full_nodes: u64,
    /// Nodes kept by the pruned map
    pub pruned_nodes: u64,
    /// Leaves of the full map
    pub full_leaves: u64,
    /// Leaves kept by the pruned map
    pub pruned_leaves: u64,
}

impl PruneStats {
    /// Fraction of stored entries dropped by pruning (diagnostic only)
    pub fn reduction(&self) -> f64 {
        let full = self.full_nodes + self.full_leaves;
        if full == 0 {
            return 0.0;
        }
        1.0 - (self.pruned_nodes + self.pruned_leaves) as f64 / full as f64
    }
}

/// Serialized form of a pruned map
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedPrunedMap {
    /// Tree height
    pub height: u8,
    /// Root of the source map
    pub root: Bytes32,
    /// Leaf count of the source map
    pub leaf_count: u64,
    /// Per-level nodes below the root; absent slots are null
    pub nodes: Vec<BTreeMap<u64, Bytes32>>,
    /// Kept sorted-list entries in ascending key order
    pub leaves: Vec<Leaf>,
}

/// Read-only slice of an indexed merkle map
#[derive(Clone, Debug)]
pub struct PrunedMap<H: MapHasher> {
    hasher: H,
    height: u8,
    root: Bytes32,
    leaf_count: u64,
    nodes: Vec<BTreeMap<u64, Bytes32>>,
    leaves: BTreeMap<MapKey, Leaf>,
    zeros: Vec<Bytes32>,
    stats: PruneStats,
}

impl<H: MapHasher> IndexedMerkleMap<H> {
    /// Builds the pruned view answering `request`
    ///
    /// For each included key the view keeps its leaf and sibling path; for
    /// each excluded key it keeps the low leaf and its sibling path.
    ///
    /// # Errors
    /// `KeyNotIncluded` or `KeyAlreadyIncluded` if a requested key does not
    /// have the requested status in this map.
    pub fn prune(&self, request: &PruneRequest) -> Result<PrunedMap<H>> {
        let mut touched = BTreeSet::new();
        for key in &request.included {
            check_key(key)?;
            let leaf = self.leaf_at(key).ok_or(MapError::KeyNotIncluded(*key))?;
            touched.insert(leaf.key);
        }
        for key in &request.excluded {
            check_key(key)?;
            if self.leaf_at(key).is_some() {
                return Err(MapError::KeyAlreadyIncluded(*key).into());
            }
            touched.insert(self.low_leaf(key)?.key);
        }

        let tree = self.tree();
        let height = tree.height();
        let leaf_count = self.leaf_count();
        let mut nodes = vec![BTreeMap::new(); height as usize];
        let mut leaves = BTreeMap::new();
        for key in touched {
            let Some(leaf) = self.leaf_at(&key) else { continue };
            for level in 0..height {
                let sibling = (leaf.index >> level) ^ 1;
                if sibling < populated(leaf_count, level) {
                    nodes[level as usize].insert(sibling, tree.node(level, sibling));
                }
            }
            leaves.insert(leaf.key, *leaf);
        }

        let stats = PruneStats {
            full_nodes: tree.stored_nodes(),
            pruned_nodes: nodes.iter().map(|level| level.len() as u64).sum(),
            full_leaves: leaf_count,
            pruned_leaves: leaves.len() as u64,
        };
        debug!(
            included = request.included.len(),
            excluded = request.excluded.len(),
            pruned_nodes = stats.pruned_nodes,
            reduction = stats.reduction(),
            "pruned map"
        );

        Ok(PrunedMap {
            hasher: self.hasher_ref().clone(),
            height,
            root: self.root(),
            leaf_count,
            nodes,
            leaves,
            zeros: tree.zeros().to_vec(),
            stats,
        })
    }
}

impl<H: MapHasher> PrunedMap<H> {
    /// Size diagnostics recorded when the view was built
    pub fn stats(&self) -> PruneStats { self.stats }

    /// Serializes the kept nodes and leaves
    pub fn serialize(&self) -> SerializedPrunedMap {
        SerializedPrunedMap {
            height: self.height,
            root: self.root,
            leaf_count: self.leaf_count,
            nodes: self.nodes.clone(),
            leaves: self.leaves.values().copied().collect(),
        }
    }

    /// Restores a pruned map, checking every kept leaf against the root
    pub fn from_serialized(serialized: SerializedPrunedMap, hasher: H) -> Result<Self> {
        let SerializedPrunedMap { height, root, leaf_count, nodes, leaves } = serialized;
        check_height(height)?;
        if nodes.len() != height as usize {
            return Err(malformed(format!(
                "expected {height} node levels, found {}",
                nodes.len()
            )));
        }
        if leaf_count == 0 || leaf_count > 1u64 << height {
            return Err(malformed(format!("leaf count {leaf_count} out of range")));
        }
        for (level, level_nodes) in nodes.iter().enumerate() {
            if let Some((&index, _)) = level_nodes.iter().next_back() {
                if index >= populated(leaf_count, level as u8) {
                    return Err(malformed(format!("node {index} at level {level} is unpopulated")));
                }
            }
        }

        let mut sorted = BTreeMap::new();
        let mut indices = BTreeSet::new();
        for leaf in &leaves {
            if leaf.key >= leaf.next_key || leaf.index >= leaf_count {
                return Err(malformed(format!("leaf at index {} is invalid", leaf.index)));
            }
            if !indices.insert(leaf.index) || sorted.insert(leaf.key, *leaf).is_some() {
                return Err(malformed(format!("duplicate leaf at index {}", leaf.index)));
            }
        }
        let ordered: Vec<&Leaf> = sorted.values().collect();
        for pair in ordered.windows(2) {
            if pair[0].next_key > pair[1].key {
                return Err(malformed("leaf links overlap".to_string()));
            }
        }

        let map = Self {
            zeros: zero_hashes(&hasher, height),
            hasher,
            height,
            root,
            leaf_count,
            nodes,
            leaves: sorted,
            stats: PruneStats::default(),
        };
        for leaf in map.leaves.values() {
            if leaf.key == MIN_KEY && leaf.index != 0 {
                return Err(malformed("sentinel is not at index 0".to_string()));
            }
            let path = map
                .path(leaf)
                .map_err(|_| malformed(format!("missing siblings for index {}", leaf.index)))?;
            let leaf_hash = leaf.hash(&map.hasher);
            if compute_root_from_path(&map.hasher, leaf_hash, leaf.index, &path) != root {
                return Err(malformed(format!("leaf at index {} does not match root", leaf.index)));
            }
        }
        Ok(map)
    }

    /// Rejected: pruned maps are read-only
    pub fn insert(&mut self, _key: MapKey, _value: MapValue) -> Result<()> {
        Err(MapError::ReadOnly.into())
    }

    /// Rejected: pruned maps are read-only
    pub fn update(&mut self, _key: MapKey, _value: MapValue) -> Result<MapValue> {
        Err(MapError::ReadOnly.into())
    }

    /// Rejected: pruned maps are read-only
    pub fn set(&mut self, _key: MapKey, _value: MapValue) -> Result<Option<MapValue>> {
        Err(MapError::ReadOnly.into())
    }

    /// Rejected: pruned maps are read-only, whatever the condition
    pub fn set_if(
        &mut self,
        _condition: bool,
        _key: MapKey,
        _value: MapValue,
    ) -> Result<Option<MapValue>> {
        Err(MapError::ReadOnly.into())
    }

    fn node(&self, level: u8, index: u64) -> Option<Bytes32> {
        if index >= populated(self.leaf_count, level) {
            return Some(self.zeros[level as usize]);
        }
        self.nodes[level as usize].get(&index).copied()
    }

    fn path(&self, leaf: &Leaf) -> Result<Vec<Bytes32>> {
        (0..self.height)
            .map(|level| {
                self.node(level, (leaf.index >> level) ^ 1)
                    .ok_or_else(|| MapError::WitnessUnavailable(leaf.key).into())
            })
            .collect()
    }
}

impl<H: MapHasher> MapView for PrunedMap<H> {
    type Hasher = H;

    fn hasher(&self) -> &H { &self.hasher }

    fn root(&self) -> Bytes32 { self.root }

    fn height(&self) -> u8 { self.height }

    fn leaf_count(&self) -> u64 { self.leaf_count }

    fn membership_proof(&self, key: &MapKey) -> Result<MembershipProof> {
        check_key(key)?;
        if let Some(leaf) = self.leaves.get(key) {
            return Ok(MembershipProof { leaf: *leaf, path: self.path(leaf)? });
        }
        // Absence is only known if a kept leaf brackets the key
        match self.leaves.range(..*key).next_back() {
            Some((_, low)) if low.brackets(key) => Err(MapError::KeyNotIncluded(*key).into()),
            _ => Err(MapError::WitnessUnavailable(*key).into()),
        }
    }

    fn non_membership_proof(&self, key: &MapKey) -> Result<NonMembershipProof> {
        check_key(key)?;
        if self.leaves.contains_key(key) {
            return Err(MapError::KeyAlreadyIncluded(*key).into());
        }
        match self.leaves.range(..*key).next_back() {
            Some((_, low)) if low.brackets(key) => {
                Ok(NonMembershipProof { low_leaf: *low, path: self.path(low)? })
            }
            _ => Err(MapError::WitnessUnavailable(*key).into()),
        }
    }
}

fn malformed(message: String) -> crate::errors::Error { MapError::Malformed(message).into() }
