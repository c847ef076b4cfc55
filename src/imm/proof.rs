//! Membership and non-membership witnesses
//!
//! These are the checks a circuit performs: recompute the root from a leaf
//! and its sibling path, then compare keys. A non-membership witness is the
//! included "low" leaf whose `(key, next_key)` gap contains the target.

use serde::{Deserialize, Serialize};

use super::leaf::{check_key, Leaf};
use super::tree::compute_root_from_path;
use crate::errors::{MapError, Result};
use crate::hash::MapHasher;
use crate::types::{Bytes32, MapKey, MapValue};

/// Witness that a key is included
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof {
    /// The leaf holding the key
    pub leaf: Leaf,
    /// Sibling hashes from the leaf level upward
    pub path: Vec<Bytes32>,
}

/// Witness that a key is not included
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonMembershipProof {
    /// Greatest included leaf whose key is smaller than the target
    pub low_leaf: Leaf,
    /// Sibling hashes of the low leaf from the leaf level upward
    pub path: Vec<Bytes32>,
}

/// Checks that `leaf` sits at its recorded index under `root`
fn verify_leaf<H: MapHasher>(
    hasher: &H,
    root: &Bytes32,
    height: u8,
    leaf: &Leaf,
    path: &[Bytes32],
) -> Result<()> {
    if path.len() != height as usize {
        return Err(MapError::InvalidPathLength { expected: height as usize, actual: path.len() }
            .into());
    }
    if leaf.index >> height != 0 {
        return Err(MapError::RootMismatch(*root).into());
    }
    let computed = compute_root_from_path(hasher, leaf.hash(hasher), leaf.index, path);
    if computed != *root {
        return Err(MapError::RootMismatch(*root).into());
    }
    Ok(())
}

/// Verifies a membership witness and returns the included value
///
/// # Arguments
/// * `hasher` - The hash function the map was built with
/// * `root` - The expected map root
/// * `height` - The map height (number of siblings in the path)
/// * `key` - The key claimed to be included
/// * `proof` - The witness
///
/// # Returns
/// The value stored under `key`
pub fn verify_membership<H: MapHasher>(
    hasher: &H,
    root: &Bytes32,
    height: u8,
    key: &MapKey,
    proof: &MembershipProof,
) -> Result<MapValue> {
    check_key(key)?;
    if proof.leaf.key != *key {
        return Err(MapError::KeyMismatch { expected: *key, found: proof.leaf.key }.into());
    }
    verify_leaf(hasher, root, height, &proof.leaf, &proof.path)?;
    Ok(proof.leaf.value)
}

/// Verifies a non-membership witness
///
/// Accepts only if the low leaf is included and `low.key < key < low.next_key`.
pub fn verify_non_membership<H: MapHasher>(
    hasher: &H,
    root: &Bytes32,
    height: u8,
    key: &MapKey,
    proof: &NonMembershipProof,
) -> Result<()> {
    check_key(key)?;
    if !proof.low_leaf.brackets(key) {
        return Err(MapError::LowLeafNotAdjacent { key: *key, low_key: proof.low_leaf.key }.into());
    }
    verify_leaf(hasher, root, height, &proof.low_leaf, &proof.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::hash::Sha256Hasher;
    use crate::imm::IndexedMerkleMap;
    use crate::imm::MapView;

    fn key(byte: u8) -> MapKey { [byte; 32] }

    fn sample_map() -> IndexedMerkleMap<Sha256Hasher> {
        let mut map = IndexedMerkleMap::new(4, Sha256Hasher).expect("should create map");
        for byte in [10u8, 20, 30] {
            map.insert(key(byte), [byte; 32]).expect("should insert key");
        }
        map
    }

    #[test]
    fn test_membership_round_trip() {
        let map = sample_map();
        let proof = map.membership_proof(&key(20)).expect("should build proof");

        let value = verify_membership(&Sha256Hasher, &map.root(), map.height(), &key(20), &proof)
            .expect("should verify membership");

        assert_eq!(value, [20u8; 32]);
    }

    #[test]
    fn test_membership_rejects_other_key() {
        let map = sample_map();
        let proof = map.membership_proof(&key(20)).expect("should build proof");

        let result = verify_membership(&Sha256Hasher, &map.root(), map.height(), &key(30), &proof);

        assert!(matches!(result, Err(Error::Map(MapError::KeyMismatch { .. }))));
    }

    #[test]
    fn test_membership_rejects_tampered_value() {
        let map = sample_map();
        let mut proof = map.membership_proof(&key(20)).expect("should build proof");
        proof.leaf.value = [99u8; 32];

        let result = verify_membership(&Sha256Hasher, &map.root(), map.height(), &key(20), &proof);

        assert!(matches!(result, Err(Error::Map(MapError::RootMismatch(_)))));
    }

    #[test]
    fn test_non_membership_round_trip() {
        let map = sample_map();
        let proof = map.non_membership_proof(&key(25)).expect("should build proof");

        let result =
            verify_non_membership(&Sha256Hasher, &map.root(), map.height(), &key(25), &proof);

        assert!(result.is_ok());
        assert_eq!(proof.low_leaf.key, key(20));
        assert_eq!(proof.low_leaf.next_key, key(30));
    }

    #[test]
    fn test_non_membership_rejects_non_adjacent_low_leaf() {
        let map = sample_map();
        // Leaf 10 is included but its successor is 20, so it cannot bracket 25
        let proof = map.non_membership_proof(&key(15)).expect("should build proof");

        let result =
            verify_non_membership(&Sha256Hasher, &map.root(), map.height(), &key(25), &proof);

        assert!(matches!(result, Err(Error::Map(MapError::LowLeafNotAdjacent { .. }))));
    }

    #[test]
    fn test_non_membership_rejects_forged_gap() {
        let map = sample_map();
        let mut proof = map.non_membership_proof(&key(15)).expect("should build proof");
        // Widen the gap so it would cover the included key 20
        proof.low_leaf.next_key = key(30);

        let result =
            verify_non_membership(&Sha256Hasher, &map.root(), map.height(), &key(20), &proof);

        assert!(matches!(result, Err(Error::Map(MapError::RootMismatch(_)))));
    }

    #[test]
    fn test_rejects_wrong_path_length() {
        let map = sample_map();
        let mut proof = map.membership_proof(&key(10)).expect("should build proof");
        proof.path.pop();

        let result = verify_membership(&Sha256Hasher, &map.root(), map.height(), &key(10), &proof);

        assert_eq!(
            result,
            Err(Error::Map(MapError::InvalidPathLength { expected: 4, actual: 3 }))
        );
    }
}
