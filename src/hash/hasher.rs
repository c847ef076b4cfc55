//! Hasher trait and the SHA-256 implementation

use sha2::{Digest as _, Sha256};

use crate::types::{Bytes32, MapKey, MapValue, IMM_LEAF_DOMAIN, IMM_NODE_DOMAIN};

/// Trait for hash functions used by indexed merkle maps and the protocols built on them
///
/// Implementations only provide [`MapHasher::hash_fields`]; leaf, node and
/// empty-slot hashing are derived from it with fixed domain tags.
///
/// # Example
///
/// ```rust
/// use shielded_rollup::hash::{MapHasher, Sha256Hasher};
///
/// let hasher = Sha256Hasher;
/// let a = hasher.hash_fields(b"tag", &[b"ab", b"c"]);
/// let b = hasher.hash_fields(b"tag", &[b"a", b"bc"]);
///
/// assert_ne!(a, b);
/// ```
pub trait MapHasher: Clone + Send + Sync {
    /// Hashes a sequence of byte strings under a domain tag
    ///
    /// The encoding must be injective: distinct `(domain_tag, inputs)` pairs,
    /// including ones that only differ in how bytes are split across inputs,
    /// must produce distinct preimages.
    fn hash_fields(&self, domain_tag: &[u8], inputs: &[&[u8]]) -> Bytes32;

    /// Computes the hash of an indexed merkle map leaf
    ///
    /// The tree index is not hashed; it is implied by the leaf's position.
    fn hash_leaf(&self, key: &MapKey, value: &MapValue, next_key: &MapKey) -> Bytes32 {
        self.hash_fields(IMM_LEAF_DOMAIN, &[key, value, next_key])
    }

    /// Computes the hash of an internal node from its children
    fn hash_internal(&self, left: &Bytes32, right: &Bytes32) -> Bytes32 {
        self.hash_fields(IMM_NODE_DOMAIN, &[left, right])
    }

    /// Hash of an empty leaf slot
    fn zero_hash(&self) -> Bytes32 { [0u8; 32] }
}

/// SHA-256 hasher implementation
///
/// Each input is prefixed with its length as a little-endian `u32`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl MapHasher for Sha256Hasher {
    fn hash_fields(&self, domain_tag: &[u8], inputs: &[&[u8]]) -> Bytes32 {
        let mut hasher = Sha256::new();
        for part in std::iter::once(domain_tag).chain(inputs.iter().copied()) {
            hasher.update((part.len() as u32).to_le_bytes());
            hasher.update(part);
        }
        hasher.finalize().into()
    }
}
