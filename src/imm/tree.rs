//! Append-only merkle node storage
//!
//! Only the populated prefix of each level is stored; nodes to the right of
//! it are roots of empty subtrees and come from the precomputed zero hashes.

use crate::hash::MapHasher;
use crate::types::Bytes32;

/// Number of populated nodes at `level` for a tree holding `leaf_count` leaves
pub(crate) fn populated(leaf_count: u64, level: u8) -> u64 {
    if leaf_count == 0 {
        0
    } else {
        ((leaf_count - 1) >> level) + 1
    }
}

/// Hashes of empty subtrees for levels `0..=height`
pub(crate) fn zero_hashes<H: MapHasher>(hasher: &H, height: u8) -> Vec<Bytes32> {
    let mut zeros = Vec::with_capacity(height as usize + 1);
    let mut current = hasher.zero_hash();
    zeros.push(current);
    for _ in 0..height {
        current = hasher.hash_internal(&current, &current);
        zeros.push(current);
    }
    zeros
}

/// Recomputes the root from a leaf hash, its index and a bottom-up sibling path
pub fn compute_root_from_path<H: MapHasher>(
    hasher: &H,
    leaf_hash: Bytes32,
    index: u64,
    path: &[Bytes32],
) -> Bytes32 {
    let mut current = leaf_hash;
    for (level, sibling) in path.iter().enumerate() {
        current = if (index >> level) & 1 == 0 {
            hasher.hash_internal(&current, sibling)
        } else {
            hasher.hash_internal(sibling, &current)
        };
    }
    current
}

/// Per-level node arrays of a full map
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NodeLayers {
    height: u8,
    levels: Vec<Vec<Bytes32>>,
    zeros: Vec<Bytes32>,
}

impl NodeLayers {
    pub(crate) fn new<H: MapHasher>(hasher: &H, height: u8) -> Self {
        Self {
            height,
            levels: vec![Vec::new(); height as usize + 1],
            zeros: zero_hashes(hasher, height),
        }
    }

    pub(crate) fn height(&self) -> u8 { self.height }

    pub(crate) fn levels(&self) -> &[Vec<Bytes32>] { &self.levels }

    pub(crate) fn zeros(&self) -> &[Bytes32] { &self.zeros }

    pub(crate) fn node(&self, level: u8, index: u64) -> Bytes32 {
        let level = level as usize;
        self.levels[level].get(index as usize).copied().unwrap_or(self.zeros[level])
    }

    pub(crate) fn root(&self) -> Bytes32 { self.node(self.height, 0) }

    /// Total number of stored nodes
    pub(crate) fn stored_nodes(&self) -> u64 {
        self.levels.iter().map(|level| level.len() as u64).sum()
    }

    /// Sibling hashes from the leaf level up to (excluding) the root
    pub(crate) fn path(&self, index: u64) -> Vec<Bytes32> {
        (0..self.height).map(|level| self.node(level, (index >> level) ^ 1)).collect()
    }

    /// Writes a leaf hash and rehashes its path to the root
    ///
    /// `index` is at most the current leaf count, so every level either
    /// overwrites a stored node or appends the next one.
    pub(crate) fn set_leaf<H: MapHasher>(&mut self, hasher: &H, index: u64, leaf_hash: Bytes32) {
        self.store(0, index, leaf_hash);
        let mut child = index;
        for level in 1..=self.height {
            let parent = child >> 1;
            let left = self.node(level - 1, parent << 1);
            let right = self.node(level - 1, (parent << 1) | 1);
            self.store(level, parent, hasher.hash_internal(&left, &right));
            child = parent;
        }
    }

    fn store(&mut self, level: u8, index: u64, hash: Bytes32) {
        let nodes = &mut self.levels[level as usize];
        let index = index as usize;
        if index < nodes.len() {
            nodes[index] = hash;
        } else {
            nodes.push(hash);
        }
    }
}
