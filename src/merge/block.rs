//! Block assembly
//!
//! [`BlockBuilder`] owns the current state and maps, verifies intents one
//! after another against them and merges the resulting certificates once
//! the block is done.

use tracing::debug;

use super::engine::merge_all;
use crate::config::RollupContext;
use crate::errors::Result;
use crate::hash::MapHasher;
use crate::state::{RollupState, SubMaps};
use crate::transition::{verify_transition, IntentProof, OperationWitness, TransitionCertificate};
use crate::types::Digest;

/// A finished block
#[derive(Clone, Debug)]
pub struct Block<H: MapHasher> {
    /// One merged certificate per run of steps sharing a registry root
    pub certificates: Vec<TransitionCertificate>,
    /// State after the last step
    pub state: RollupState,
    /// Maps after the last step
    pub maps: SubMaps<H>,
}

/// Applies intents in order and collects their certificates
pub struct BlockBuilder<'a, H: MapHasher> {
    ctx: &'a RollupContext<H>,
    state: RollupState,
    maps: SubMaps<H>,
    certificates: Vec<TransitionCertificate>,
}

impl<'a, H: MapHasher> BlockBuilder<'a, H> {
    /// Starts a block at `state`
    ///
    /// # Errors
    /// `SubMapRootMismatch` if `maps` do not match `state`
    pub fn new(ctx: &'a RollupContext<H>, state: RollupState, maps: SubMaps<H>) -> Result<Self> {
        maps.verify_against(&state)?;
        Ok(Self { ctx, state, maps, certificates: Vec::new() })
    }

    /// Digest of the current state
    pub fn digest(&self) -> Digest { self.state.digest(self.ctx.hasher()) }

    /// Current state
    pub fn state(&self) -> &RollupState { &self.state }

    /// Current maps
    pub fn maps(&self) -> &SubMaps<H> { &self.maps }

    /// Number of accepted steps
    pub fn len(&self) -> usize { self.certificates.len() }

    /// Returns true if no step was accepted yet
    pub fn is_empty(&self) -> bool { self.certificates.is_empty() }

    /// Verifies and applies one intent
    ///
    /// A rejected intent leaves the builder unchanged.
    pub fn apply(
        &mut self,
        proof: &IntentProof,
        witness: &OperationWitness,
    ) -> Result<&TransitionCertificate> {
        let pre = self.digest();
        let output =
            verify_transition(self.ctx, &pre, &self.state, &mut self.maps, proof, witness)?;
        self.state = output.state;
        self.certificates.push(output.certificate);
        Ok(&self.certificates[self.certificates.len() - 1])
    }

    /// Merges the collected certificates
    ///
    /// Steps are grouped into maximal runs with one registry root; a
    /// `RegisterProgram` step therefore starts a new run after it.
    pub fn finish(self) -> Result<Block<H>> {
        let certificates = self
            .certificates
            .chunk_by(|left, right| left.registry_root() == right.registry_root())
            .map(merge_all)
            .collect::<Result<Vec<_>>>()?;
        debug!(
            steps = self.certificates.len(),
            runs = certificates.len(),
            sequence = self.state.sequence,
            "block finished"
        );
        Ok(Block { certificates, state: self.state, maps: self.maps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RollupConfig;
    use crate::errors::{Error, TransitionError};
    use crate::hash::Sha256Hasher;
    use crate::transition::{register_program, Intent, IntentAction, IntentProgram, OperationKind};

    struct Fixture {
        ctx: RollupContext<Sha256Hasher>,
        governor: IntentProgram,
        closer: IntentProgram,
    }

    fn fixture() -> (Fixture, RollupState, SubMaps<Sha256Hasher>) {
        let ctx = RollupContext::with_hasher(RollupConfig::default(), Sha256Hasher)
            .expect("should build context");
        let mut maps = SubMaps::genesis(&ctx).expect("should create maps");
        let governor = IntentProgram::from_secret(&ctx, &[1u8; 32]).expect("should create program");
        let closer = IntentProgram::from_secret(&ctx, &[2u8; 32]).expect("should create program");
        register_program(
            &mut maps.registry,
            &governor.verification_key(),
            OperationKind::RegisterProgram,
        )
        .expect("should register governor");
        register_program(
            &mut maps.registry,
            &closer.verification_key(),
            OperationKind::CloseBlock,
        )
        .expect("should register closer");
        let state = RollupState::from_maps(&maps);
        (Fixture { ctx, governor, closer }, state, maps)
    }

    fn close(f: &Fixture, builder: &BlockBuilder<'_, Sha256Hasher>) -> IntentProof {
        f.closer.prove(&f.ctx, Intent::anchored(IntentAction::CloseBlock, builder.state()))
    }

    #[test]
    fn test_block_merges_steps() {
        let (f, state, maps) = fixture();
        let start = state.digest(f.ctx.hasher());
        let mut builder = BlockBuilder::new(&f.ctx, state, maps).expect("should start block");

        let proof = close(&f, &builder);
        builder.apply(&proof, &OperationWitness::None).expect("should close block 0");
        let proof = close(&f, &builder);
        builder.apply(&proof, &OperationWitness::None).expect("should close block 1");
        let end = builder.digest();
        let block = builder.finish().expect("should finish block");

        assert_eq!(block.certificates.len(), 1);
        assert_eq!(block.certificates[0].pre_digest(), &start);
        assert_eq!(block.certificates[0].post_digest(), &end);
        assert_eq!(block.certificates[0].length(), 2);
        assert_eq!(block.state.block_number, 2);
    }

    #[test]
    fn test_registration_splits_runs() {
        let (f, state, maps) = fixture();
        let mut builder = BlockBuilder::new(&f.ctx, state, maps).expect("should start block");
        let newcomer =
            IntentProgram::from_secret(&f.ctx, &[3u8; 32]).expect("should create program");
        let action = IntentAction::RegisterProgram {
            vk: newcomer.verification_key(),
            kind: OperationKind::Mint,
        };

        let proof = close(&f, &builder);
        builder.apply(&proof, &OperationWitness::None).expect("should close block");
        let register = f.governor.prove(&f.ctx, Intent::anchored(action, builder.state()));
        builder.apply(&register, &OperationWitness::None).expect("should register");
        let proof = close(&f, &builder);
        builder.apply(&proof, &OperationWitness::None).expect("should close block");
        let block = builder.finish().expect("should finish block");

        assert_eq!(block.certificates.len(), 2);
        assert_eq!(block.certificates[0].length(), 2);
        assert_eq!(block.certificates[1].length(), 1);
        assert_eq!(block.certificates[0].post_digest(), block.certificates[1].pre_digest());
    }

    #[test]
    fn test_rejected_intent_leaves_builder_unchanged() {
        let (f, state, maps) = fixture();
        let mut builder = BlockBuilder::new(&f.ctx, state, maps).expect("should start block");
        let before = builder.digest();
        let forged =
            f.governor.prove(&f.ctx, Intent::anchored(IntentAction::CloseBlock, builder.state()));

        let result = builder.apply(&forged, &OperationWitness::None).map(|_| ());

        assert!(matches!(
            result,
            Err(Error::Transition(TransitionError::KindNotPermitted { .. }))
        ));
        assert_eq!(builder.digest(), before);
        assert!(builder.is_empty());
    }

    #[test]
    fn test_replayed_close_is_rejected() {
        let (f, state, maps) = fixture();
        let mut builder = BlockBuilder::new(&f.ctx, state, maps).expect("should start block");
        let first = close(&f, &builder);
        builder.apply(&first, &OperationWitness::None).expect("should close block 0");
        let before = builder.digest();

        let result = builder.apply(&first, &OperationWitness::None).map(|_| ());

        assert!(matches!(
            result,
            Err(Error::Transition(TransitionError::StaleScalar { .. }))
        ));
        assert_eq!(builder.digest(), before);
        assert_eq!(builder.len(), 1);
    }
}
