//! Read-side interface shared by full and pruned maps

use super::proof::{verify_membership, verify_non_membership, MembershipProof, NonMembershipProof};
use crate::errors::Result;
use crate::hash::MapHasher;
use crate::types::{Bytes32, MapKey, MapValue};

/// Read access to an indexed merkle map through verified witnesses
///
/// Implementors only produce witnesses; the provided methods check every
/// witness against [`MapView::root`] before answering, so a view that
/// returns a bad witness makes the query fail instead of answering wrongly.
pub trait MapView {
    /// Hash function of the map
    type Hasher: MapHasher;

    /// Hasher used to verify witnesses
    fn hasher(&self) -> &Self::Hasher;

    /// Current root
    fn root(&self) -> Bytes32;

    /// Tree height
    fn height(&self) -> u8;

    /// Number of used leaf slots, including the sentinel
    fn leaf_count(&self) -> u64;

    /// Witness that `key` is included
    fn membership_proof(&self, key: &MapKey) -> Result<MembershipProof>;

    /// Witness that `key` is not included
    fn non_membership_proof(&self, key: &MapKey) -> Result<NonMembershipProof>;

    /// Proves `key` is included and returns its value
    fn assert_included(&self, key: &MapKey) -> Result<MapValue> {
        let proof = self.membership_proof(key)?;
        verify_membership(self.hasher(), &self.root(), self.height(), key, &proof)
    }

    /// Proves `key` is not included
    fn assert_not_included(&self, key: &MapKey) -> Result<()> {
        let proof = self.non_membership_proof(key)?;
        verify_non_membership(self.hasher(), &self.root(), self.height(), key, &proof)
    }

    /// Verified lookup; fails with `KeyNotIncluded` for absent keys
    fn get(&self, key: &MapKey) -> Result<MapValue> { self.assert_included(key) }
}
