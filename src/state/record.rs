//! The rollup state record and its digest

use serde::{Deserialize, Serialize};

use super::submap::{Scalar, SubMap};
use crate::errors::{Result, StateError};
use crate::hash::MapHasher;
use crate::types::{Bytes32, Digest, STATE_DIGEST_DOMAIN};

/// Every sub-map root plus the scalar parameters
///
/// Fields are addressed through [`SubMap`] and [`Scalar`]; the accessors
/// are exhaustive matches, so adding a field without handling it everywhere
/// does not compile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupState {
    /// Root of the note ledger
    pub ledger_root: Bytes32,
    /// Root of the verification key registry
    pub registry_root: Bytes32,
    /// Root of the block history
    pub history_root: Bytes32,
    /// Root of the vaults sub-map
    pub vaults_root: Bytes32,
    /// Root of the governance sub-map
    pub governance_root: Bytes32,
    /// Root of the bridge sub-map
    pub bridge_root: Bytes32,
    /// Oracle price
    pub oracle_price: u64,
    /// Collateral ratio
    pub collateral_ratio: u64,
    /// Total supply
    pub total_supply: u64,
    /// Current block number
    pub block_number: u64,
    /// Transition sequence number
    pub sequence: u64,
}

impl RollupState {
    /// Root of a sub-map
    pub fn root(&self, sub_map: SubMap) -> Bytes32 {
        match sub_map {
            SubMap::Ledger => self.ledger_root,
            SubMap::Registry => self.registry_root,
            SubMap::History => self.history_root,
            SubMap::Vaults => self.vaults_root,
            SubMap::Governance => self.governance_root,
            SubMap::Bridge => self.bridge_root,
        }
    }

    /// Replaces the root of a sub-map
    pub fn set_root(&mut self, sub_map: SubMap, root: Bytes32) {
        let field = match sub_map {
            SubMap::Ledger => &mut self.ledger_root,
            SubMap::Registry => &mut self.registry_root,
            SubMap::History => &mut self.history_root,
            SubMap::Vaults => &mut self.vaults_root,
            SubMap::Governance => &mut self.governance_root,
            SubMap::Bridge => &mut self.bridge_root,
        };
        *field = root;
    }

    /// Value of a scalar
    pub fn scalar(&self, scalar: Scalar) -> u64 {
        match scalar {
            Scalar::OraclePrice => self.oracle_price,
            Scalar::CollateralRatio => self.collateral_ratio,
            Scalar::TotalSupply => self.total_supply,
            Scalar::BlockNumber => self.block_number,
            Scalar::Sequence => self.sequence,
        }
    }

    /// Replaces a scalar
    pub fn set_scalar(&mut self, scalar: Scalar, value: u64) {
        let field = match scalar {
            Scalar::OraclePrice => &mut self.oracle_price,
            Scalar::CollateralRatio => &mut self.collateral_ratio,
            Scalar::TotalSupply => &mut self.total_supply,
            Scalar::BlockNumber => &mut self.block_number,
            Scalar::Sequence => &mut self.sequence,
        };
        *field = value;
    }

    /// Adds to a scalar, failing on overflow
    pub fn increase(&mut self, scalar: Scalar, amount: u64) -> Result<u64> {
        let value =
            self.scalar(scalar).checked_add(amount).ok_or(StateError::ScalarOverflow(scalar))?;
        self.set_scalar(scalar, value);
        Ok(value)
    }

    /// Subtracts from a scalar, failing on underflow
    pub fn decrease(&mut self, scalar: Scalar, amount: u64) -> Result<u64> {
        let value =
            self.scalar(scalar).checked_sub(amount).ok_or(StateError::ScalarUnderflow(scalar))?;
        self.set_scalar(scalar, value);
        Ok(value)
    }

    /// Canonical encoding: roots in [`SubMap::ALL`] order, then scalars in
    /// [`Scalar::ALL`] order as little-endian `u64`
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SubMap::ALL.len() * 32 + Scalar::ALL.len() * 8);
        for sub_map in SubMap::ALL {
            bytes.extend_from_slice(&self.root(sub_map));
        }
        for scalar in Scalar::ALL {
            bytes.extend_from_slice(&self.scalar(scalar).to_le_bytes());
        }
        bytes
    }

    /// Digest of the whole record
    pub fn digest<H: MapHasher>(&self, hasher: &H) -> Digest {
        hasher.hash_fields(STATE_DIGEST_DOMAIN, &[&self.encode()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha256Hasher;

    #[test]
    fn test_every_field_changes_digest() {
        let state = RollupState::default();
        let base = state.digest(&Sha256Hasher);

        for sub_map in SubMap::ALL {
            let mut changed = state;
            changed.set_root(sub_map, [1u8; 32]);
            assert_ne!(changed.digest(&Sha256Hasher), base, "{sub_map:?} must be bound");
        }
        for scalar in Scalar::ALL {
            let mut changed = state;
            changed.set_scalar(scalar, 1);
            assert_ne!(changed.digest(&Sha256Hasher), base, "{scalar:?} must be bound");
        }
    }

    #[test]
    fn test_roots_are_position_bound() {
        let mut ledger = RollupState::default();
        ledger.set_root(SubMap::Ledger, [1u8; 32]);
        let mut bridge = RollupState::default();
        bridge.set_root(SubMap::Bridge, [1u8; 32]);

        assert_ne!(ledger.digest(&Sha256Hasher), bridge.digest(&Sha256Hasher));
    }

    #[test]
    fn test_decrease_underflow() {
        let mut state = RollupState::default();

        let result = state.decrease(Scalar::TotalSupply, 1);

        assert!(result.is_err());
        assert_eq!(state.total_supply, 0);
    }

    #[test]
    fn test_increase() {
        let mut state = RollupState::default();

        let value = state.increase(Scalar::Sequence, 3).expect("should increase");

        assert_eq!(value, 3);
        assert_eq!(state.scalar(Scalar::Sequence), 3);
    }
}
