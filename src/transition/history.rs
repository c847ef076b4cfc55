//! Block history
//!
//! Closing block `n` records the digest it closed at under `index_key(n)`.
//! Intents that depend on historical state cite such a snapshot and must
//! prove it is both authentic and old enough.

use crate::errors::{Error, MapError, Result, TransitionError};
use crate::hash::MapHasher;
use crate::imm::{IndexedMerkleMap, MapView};
use crate::types::{index_key, Digest};

/// Records the digest of block `block_number`
pub fn record_snapshot<H: MapHasher>(
    history: &mut IndexedMerkleMap<H>,
    block_number: u64,
    digest: Digest,
) -> Result<()> {
    history.insert(index_key(block_number), digest)
}

/// Proves `digest` is the recorded snapshot of `block_number` and that it
/// is at least `cooldown` blocks older than `current_block`
pub fn check_snapshot<V: MapView>(
    history: &V,
    block_number: u64,
    digest: &Digest,
    current_block: u64,
    cooldown: u64,
) -> Result<()> {
    let age = current_block.checked_sub(block_number);
    if age.map_or(true, |age| age < cooldown) {
        return Err(TransitionError::SnapshotTooRecent {
            snapshot: block_number,
            current: current_block,
            cooldown,
        }
        .into());
    }
    let recorded = history.assert_included(&index_key(block_number)).map_err(|err| match err {
        Error::Map(MapError::KeyNotIncluded(_)) => {
            TransitionError::SnapshotMismatch(block_number).into()
        }
        other => other,
    })?;
    if recorded != *digest {
        return Err(TransitionError::SnapshotMismatch(block_number).into());
    }
    Ok(())
}
