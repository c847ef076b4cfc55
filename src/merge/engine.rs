//! Binary certificate merging

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::RollupContext;
use crate::errors::{MergeError, Result};
use crate::hash::MapHasher;
use crate::state::{RollupState, SubMaps};
use crate::transition::TransitionCertificate;

/// Anchors the chain at an attested initial state
///
/// The certificate spans zero transitions: pre and post digest are both the
/// digest of `state`.
///
/// # Errors
/// * `NotGenesis` - `state` has already applied transitions
/// * `SubMapRootMismatch` - `maps` do not match `state`
pub fn genesis_certificate<H: MapHasher>(
    ctx: &RollupContext<H>,
    state: &RollupState,
    maps: &SubMaps<H>,
) -> Result<TransitionCertificate> {
    if state.sequence != 0 {
        return Err(MergeError::NotGenesis(state.sequence).into());
    }
    maps.verify_against(state)?;
    let digest = state.digest(ctx.hasher());
    debug!(digest = %hex::encode(digest), "genesis certificate");
    Ok(TransitionCertificate::new(digest, digest, state.registry_root, 0))
}

/// Combines two adjacent certificates into one spanning both
///
/// # Errors
/// * `NotAdjacent` - `left` does not end where `right` starts
/// * `RegistryMismatch` - The runs were checked against different registries
/// * `LengthOverflow` - The combined length does not fit
///
/// # Examples
/// ```
/// use shielded_rollup::{
///     genesis_certificate, merge, RollupConfig, RollupContext, RollupState, SubMaps,
/// };
///
/// let ctx = RollupContext::new(RollupConfig::default())?;
/// let maps = SubMaps::genesis(&ctx)?;
/// let state = RollupState::from_maps(&maps);
/// let genesis = genesis_certificate(&ctx, &state, &maps)?;
///
/// let merged = merge(&genesis, &genesis)?;
/// assert_eq!(merged.length(), 0);
/// # Ok::<(), shielded_rollup::Error>(())
/// ```
pub fn merge(
    left: &TransitionCertificate,
    right: &TransitionCertificate,
) -> Result<TransitionCertificate> {
    if left.post_digest() != right.pre_digest() {
        let err = MergeError::NotAdjacent {
            left_post: *left.post_digest(),
            right_pre: *right.pre_digest(),
        };
        warn!(error = %err, "merge rejected");
        return Err(err.into());
    }
    if left.registry_root() != right.registry_root() {
        warn!("merge rejected: registry roots differ");
        return Err(MergeError::RegistryMismatch.into());
    }
    let length = left.length().checked_add(right.length()).ok_or(MergeError::LengthOverflow)?;
    Ok(TransitionCertificate::new(
        *left.pre_digest(),
        *right.post_digest(),
        *left.registry_root(),
        length,
    ))
}

/// Merges a chain of certificates in order
///
/// Pairs are merged level by level; every level runs in parallel.
pub fn merge_all(certificates: &[TransitionCertificate]) -> Result<TransitionCertificate> {
    if certificates.is_empty() {
        return Err(MergeError::Empty.into());
    }
    let mut level = certificates.to_vec();
    while level.len() > 1 {
        level = level
            .par_chunks(2)
            .map(|pair| match pair {
                [left, right] => merge(left, right),
                [single] => Ok(*single),
                _ => Err(MergeError::Empty.into()),
            })
            .collect::<Result<Vec<_>>>()?;
    }
    let merged = level.pop().ok_or(MergeError::Empty)?;
    debug!(inputs = certificates.len(), length = merged.length(), "certificates merged");
    Ok(merged)
}
