//! Transition certificates

use serde::Serialize;

use crate::types::{Bytes32, Digest};

/// Verified claim that `length` transitions lead from `pre_digest` to
/// `post_digest`, each authorized against `registry_root`
///
/// Only the verifier, genesis and merge produce certificates, so holding
/// one means its claim was checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TransitionCertificate {
    pre_digest: Digest,
    post_digest: Digest,
    registry_root: Bytes32,
    length: u64,
}

impl TransitionCertificate {
    pub(crate) fn new(
        pre_digest: Digest,
        post_digest: Digest,
        registry_root: Bytes32,
        length: u64,
    ) -> Self {
        Self { pre_digest, post_digest, registry_root, length }
    }

    /// Digest of the state the run starts from
    pub fn pre_digest(&self) -> &Digest { &self.pre_digest }

    /// Digest of the state the run ends at
    pub fn post_digest(&self) -> &Digest { &self.post_digest }

    /// Registry root every step was checked against
    pub fn registry_root(&self) -> &Bytes32 { &self.registry_root }

    /// Number of transitions covered
    pub fn length(&self) -> u64 { self.length }
}
