//! Live-state values an intent was built against

use super::history::check_snapshot;
use crate::config::RollupContext;
use crate::errors::{Result, TransitionError};
use crate::hash::MapHasher;
use crate::state::{RollupState, Scalar, SubMap, SubMaps};
use crate::types::{Bytes32, Digest};

/// One declared value that must match the current state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precondition {
    /// A sub-map root
    Root {
        /// The sub-map
        sub_map: SubMap,
        /// Declared root
        root: Bytes32,
    },
    /// A scalar parameter
    Scalar {
        /// The scalar
        scalar: Scalar,
        /// Declared value
        value: u64,
    },
    /// A historical state digest, old enough to be final
    Snapshot {
        /// Block the snapshot was recorded at
        block_number: u64,
        /// Recorded digest
        digest: Digest,
    },
}

impl Precondition {
    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Precondition::Root { sub_map, root } => {
                out.push(0);
                out.push(sub_map.code());
                out.extend_from_slice(root);
            }
            Precondition::Scalar { scalar, value } => {
                out.push(1);
                out.push(scalar.code());
                out.extend_from_slice(&value.to_le_bytes());
            }
            Precondition::Snapshot { block_number, digest } => {
                out.push(2);
                out.extend_from_slice(&block_number.to_le_bytes());
                out.extend_from_slice(digest);
            }
        }
    }

    /// Checks the declared value against `state`
    ///
    /// `maps` must already be verified against `state`.
    ///
    /// # Errors
    /// * `StaleRoot` / `StaleScalar` - The declared value is not the live one
    /// * `SnapshotMismatch` - The digest is not the one recorded for the block
    /// * `SnapshotTooRecent` - The snapshot is younger than the configured cooldown
    pub fn check<H: MapHasher>(
        &self,
        ctx: &RollupContext<H>,
        state: &RollupState,
        maps: &SubMaps<H>,
    ) -> Result<()> {
        match *self {
            Precondition::Root { sub_map, root } => {
                if state.root(sub_map) != root {
                    return Err(TransitionError::StaleRoot(sub_map).into());
                }
            }
            Precondition::Scalar { scalar, value } => {
                let live = state.scalar(scalar);
                if live != value {
                    return Err(
                        TransitionError::StaleScalar { scalar, declared: value, live }.into()
                    );
                }
            }
            Precondition::Snapshot { block_number, digest } => check_snapshot(
                maps.get(SubMap::History),
                block_number,
                &digest,
                state.block_number,
                ctx.config().snapshot_cooldown,
            )?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RollupConfig;
    use crate::errors::Error;
    use crate::hash::Sha256Hasher;
    use crate::transition::history::record_snapshot;

    fn setup() -> (RollupContext<Sha256Hasher>, RollupState, SubMaps<Sha256Hasher>) {
        let ctx = RollupContext::with_hasher(RollupConfig::default(), Sha256Hasher)
            .expect("should build context");
        let mut maps = SubMaps::genesis(&ctx).expect("should create maps");
        record_snapshot(&mut maps.history, 0, [3u8; 32]).expect("should record snapshot");
        let mut state = RollupState::from_maps(&maps);
        state.oracle_price = 2_000;
        state.block_number = 1;
        (ctx, state, maps)
    }

    #[test]
    fn test_live_values_pass() {
        let (ctx, state, maps) = setup();
        let preconditions = [
            Precondition::Root { sub_map: SubMap::Ledger, root: state.ledger_root },
            Precondition::Scalar { scalar: Scalar::OraclePrice, value: 2_000 },
            Precondition::Snapshot { block_number: 0, digest: [3u8; 32] },
        ];

        for precondition in preconditions {
            assert!(precondition.check(&ctx, &state, &maps).is_ok(), "{precondition:?}");
        }
    }

    #[test]
    fn test_stale_price_is_rejected() {
        let (ctx, state, maps) = setup();

        let result = Precondition::Scalar { scalar: Scalar::OraclePrice, value: 1_999 }
            .check(&ctx, &state, &maps);

        assert_eq!(
            result,
            Err(Error::Transition(TransitionError::StaleScalar {
                scalar: Scalar::OraclePrice,
                declared: 1_999,
                live: 2_000,
            }))
        );
    }

    #[test]
    fn test_stale_root_is_rejected() {
        let (ctx, state, maps) = setup();

        let result = Precondition::Root { sub_map: SubMap::Vaults, root: [1u8; 32] }
            .check(&ctx, &state, &maps);

        assert_eq!(result, Err(Error::Transition(TransitionError::StaleRoot(SubMap::Vaults))));
    }

    #[test]
    fn test_forged_snapshot_is_rejected() {
        let (ctx, state, maps) = setup();

        let result = Precondition::Snapshot { block_number: 0, digest: [4u8; 32] }
            .check(&ctx, &state, &maps);

        assert_eq!(result, Err(Error::Transition(TransitionError::SnapshotMismatch(0))));
    }

    #[test]
    fn test_encodings_are_distinct() {
        let mut root = Vec::new();
        let mut scalar = Vec::new();
        Precondition::Root { sub_map: SubMap::Ledger, root: [0u8; 32] }.encode_into(&mut root);
        Precondition::Scalar { scalar: Scalar::OraclePrice, value: 0 }.encode_into(&mut scalar);

        assert_ne!(root, scalar);
    }
}
