//! Single-step transition verifier

use tracing::{debug, warn};

use super::certificate::TransitionCertificate;
use super::intent::{IntentAction, IntentProof};
use super::operation::{apply, OperationWitness};
use super::registry::check_registered;
use crate::config::RollupContext;
use crate::errors::{Result, StateError, TransitionError};
use crate::hash::MapHasher;
use crate::state::{RollupState, Scalar, SubMap, SubMaps};
use crate::types::Digest;

/// Result of an accepted transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionOutput {
    /// Certificate for the step
    pub certificate: TransitionCertificate,
    /// Post state; its digest is the certificate's post digest
    pub state: RollupState,
}

/// Verifies one intent against the current state and applies it
///
/// The checks run in a fixed order: digest binding, sub-map consistency,
/// intent proof, registry, anchor and preconditions, then the operation
/// itself. `maps` is only written once every check has passed.
///
/// Kinds with an anchor must pin its live value, so a proof accepted once
/// goes stale as soon as the anchored counter moves on.
///
/// # Arguments
/// * `ctx` - Shared rollup context
/// * `pre_digest` - Digest the caller claims for `state`
/// * `state` - Current state record
/// * `maps` - Full sub-maps matching `state`, updated in place on success
/// * `proof` - Intent proof authorizing the operation
/// * `witness` - Private witness the operation needs
///
/// # Returns
/// The post state and a length-one certificate
///
/// # Errors
/// * `DigestMismatch` - `pre_digest` is not the digest of `state`
/// * `SubMapRootMismatch` - `maps` do not match `state`
/// * `InvalidIntentProof` / `UnregisteredProgram` / `KindNotPermitted`
/// * `MissingAnchor` - The intent does not pin its kind's counter
/// * Any stale precondition or operation error
pub fn verify_transition<H: MapHasher>(
    ctx: &RollupContext<H>,
    pre_digest: &Digest,
    state: &RollupState,
    maps: &mut SubMaps<H>,
    proof: &IntentProof,
    witness: &OperationWitness,
) -> Result<TransitionOutput> {
    let result = verify_inner(ctx, pre_digest, state, maps, proof, witness);
    match &result {
        Ok(output) => debug!(
            kind = ?proof.intent.kind(),
            sequence = output.state.sequence,
            post = %hex::encode(output.certificate.post_digest()),
            "transition accepted"
        ),
        Err(err) => warn!(kind = ?proof.intent.kind(), error = %err, "transition rejected"),
    }
    result
}

fn verify_inner<H: MapHasher>(
    ctx: &RollupContext<H>,
    pre_digest: &Digest,
    state: &RollupState,
    maps: &mut SubMaps<H>,
    proof: &IntentProof,
    witness: &OperationWitness,
) -> Result<TransitionOutput> {
    let computed = state.digest(ctx.hasher());
    if computed != *pre_digest {
        return Err(TransitionError::DigestMismatch { expected: *pre_digest, computed }.into());
    }
    maps.verify_against(state)?;

    let intent = proof.verify(ctx)?;
    if let IntentAction::EmergencySettle { .. } = intent.action {
        return Err(TransitionError::NotATransition(intent.kind()).into());
    }
    check_registered(maps.get(SubMap::Registry), &proof.vk, intent.kind())?;
    intent.check_anchor()?;
    for precondition in &intent.preconditions {
        precondition.check(ctx, state, maps)?;
    }

    let mut next = *state;
    next.sequence =
        state.sequence.checked_add(1).ok_or(StateError::ScalarOverflow(Scalar::Sequence))?;
    apply(ctx, pre_digest, &intent.action, witness, &mut next, maps)?;
    maps.write_roots(&mut next);

    let post_digest = next.digest(ctx.hasher());
    let certificate =
        TransitionCertificate::new(*pre_digest, post_digest, state.registry_root, 1);
    Ok(TransitionOutput { certificate, state: next })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RollupConfig;
    use crate::errors::Error;
    use crate::hash::Sha256Hasher;
    use crate::imm::MapView;
    use crate::ledger::{Note, NoteTransaction, SpendingKey};
    use crate::transition::intent::{Intent, IntentProgram, OperationKind};
    use crate::transition::precondition::Precondition;
    use crate::transition::registry::register_program;

    struct Fixture {
        ctx: RollupContext<Sha256Hasher>,
        state: RollupState,
        maps: SubMaps<Sha256Hasher>,
        minter: IntentProgram,
        closer: IntentProgram,
        governor: IntentProgram,
    }

    fn fixture() -> Fixture {
        let ctx = RollupContext::with_hasher(RollupConfig::default(), Sha256Hasher)
            .expect("should build context");
        let mut maps = SubMaps::genesis(&ctx).expect("should create maps");
        let minter = IntentProgram::from_secret(&ctx, &[1u8; 32]).expect("should create program");
        let closer = IntentProgram::from_secret(&ctx, &[2u8; 32]).expect("should create program");
        let governor =
            IntentProgram::from_secret(&ctx, &[6u8; 32]).expect("should create program");
        register_program(&mut maps.registry, &minter.verification_key(), OperationKind::Mint)
            .expect("should register minter");
        register_program(
            &mut maps.registry,
            &closer.verification_key(),
            OperationKind::CloseBlock,
        )
        .expect("should register closer");
        register_program(
            &mut maps.registry,
            &governor.verification_key(),
            OperationKind::DomainUpdate,
        )
        .expect("should register governor");
        let state = RollupState::from_maps(&maps);
        Fixture { ctx, state, maps, minter, closer, governor }
    }

    fn mint_witness(f: &Fixture, amount: u64) -> (Intent, OperationWitness) {
        let owner = SpendingKey::from_bytes(&[3u8; 32]).expect("should create key");
        let note =
            Note::new(amount, owner.address(f.ctx.secp(), f.ctx.hasher()), [4u8; 32], [5u8; 32]);
        let tx = NoteTransaction::mint(&f.ctx, &[note]).expect("should build mint");
        let binding = tx.binding_hash(f.ctx.hasher());
        (Intent::new(IntentAction::Mint { amount, binding }), OperationWitness::Notes(tx))
    }

    #[test]
    fn test_accepted_transition_certifies_post_state() {
        let mut f = fixture();
        let pre = f.state.digest(f.ctx.hasher());
        let (intent, witness) = mint_witness(&f, 500);
        let proof = f.minter.prove(&f.ctx, intent);

        let output = verify_transition(&f.ctx, &pre, &f.state, &mut f.maps, &proof, &witness)
            .expect("should accept mint");

        assert_eq!(output.certificate.pre_digest(), &pre);
        assert_eq!(output.certificate.post_digest(), &output.state.digest(f.ctx.hasher()));
        assert_eq!(output.certificate.registry_root(), &f.state.registry_root);
        assert_eq!(output.certificate.length(), 1);
        assert_eq!(output.state.sequence, 1);
        assert_eq!(output.state.total_supply, 500);
        assert_eq!(output.state.ledger_root, f.maps.ledger.root());
    }

    #[test]
    fn test_wrong_pre_digest_is_rejected() {
        let mut f = fixture();
        let (intent, witness) = mint_witness(&f, 500);
        let proof = f.minter.prove(&f.ctx, intent);

        let result =
            verify_transition(&f.ctx, &[0u8; 32], &f.state, &mut f.maps, &proof, &witness);

        assert!(matches!(
            result,
            Err(Error::Transition(TransitionError::DigestMismatch { .. }))
        ));
    }

    #[test]
    fn test_diverged_maps_are_rejected() {
        let mut f = fixture();
        let pre = f.state.digest(f.ctx.hasher());
        f.maps.bridge.insert([1u8; 32], [1u8; 32]).expect("should insert key");
        let proof = f.closer.prove(&f.ctx, Intent::new(IntentAction::CloseBlock));

        let result = verify_transition(
            &f.ctx,
            &pre,
            &f.state,
            &mut f.maps,
            &proof,
            &OperationWitness::None,
        );

        assert_eq!(result, Err(Error::State(StateError::SubMapRootMismatch(SubMap::Bridge))));
    }

    #[test]
    fn test_program_outside_its_kind_is_rejected() {
        let mut f = fixture();
        let pre = f.state.digest(f.ctx.hasher());
        let proof = f.minter.prove(&f.ctx, Intent::new(IntentAction::CloseBlock));

        let result = verify_transition(
            &f.ctx,
            &pre,
            &f.state,
            &mut f.maps,
            &proof,
            &OperationWitness::None,
        );

        assert_eq!(
            result,
            Err(Error::Transition(TransitionError::KindNotPermitted {
                registered: Some(OperationKind::Mint),
                requested: OperationKind::CloseBlock,
            }))
        );
    }

    #[test]
    fn test_stale_precondition_leaves_maps_unchanged() {
        let mut f = fixture();
        let pre = f.state.digest(f.ctx.hasher());
        let ledger_root = f.maps.ledger.root();
        let (intent, witness) = mint_witness(&f, 500);
        let stale = Precondition::Scalar { scalar: Scalar::OraclePrice, value: 9 };
        let intent = intent.with_precondition(stale);
        let proof = f.minter.prove(&f.ctx, intent);

        let result = verify_transition(&f.ctx, &pre, &f.state, &mut f.maps, &proof, &witness);

        assert!(matches!(
            result,
            Err(Error::Transition(TransitionError::StaleScalar { .. }))
        ));
        assert_eq!(f.maps.ledger.root(), ledger_root);
    }

    #[test]
    fn test_chained_steps_are_adjacent() {
        let mut f = fixture();
        let pre = f.state.digest(f.ctx.hasher());
        let first = f.closer.prove(&f.ctx, Intent::anchored(IntentAction::CloseBlock, &f.state));
        let one = verify_transition(
            &f.ctx,
            &pre,
            &f.state,
            &mut f.maps,
            &first,
            &OperationWitness::None,
        )
        .expect("should close block 0");
        let snapshot = Precondition::Snapshot { block_number: 0, digest: pre };
        let intent =
            Intent::anchored(IntentAction::CloseBlock, &one.state).with_precondition(snapshot);
        let second = f.closer.prove(&f.ctx, intent);

        let two = verify_transition(
            &f.ctx,
            one.certificate.post_digest(),
            &one.state,
            &mut f.maps,
            &second,
            &OperationWitness::None,
        )
        .expect("should close block 1");

        assert_eq!(two.certificate.pre_digest(), one.certificate.post_digest());
        assert_eq!(two.state.block_number, 2);
        assert_eq!(two.state.sequence, 2);
    }

    fn vault_write(f: &Fixture, state: &RollupState, value: u8) -> IntentProof {
        let action = IntentAction::DomainUpdate {
            sub_map: SubMap::Vaults,
            writes: vec![([5u8; 32], [value; 32])],
        };
        f.governor.prove(&f.ctx, Intent::anchored(action, state))
    }

    #[test]
    fn test_replayed_domain_update_is_rejected() {
        let mut f = fixture();
        let pre = f.state.digest(f.ctx.hasher());
        let first = vault_write(&f, &f.state, 1);
        let one = verify_transition(
            &f.ctx,
            &pre,
            &f.state,
            &mut f.maps,
            &first,
            &OperationWitness::None,
        )
        .expect("should write 1");
        let second = vault_write(&f, &one.state, 2);
        let two = verify_transition(
            &f.ctx,
            one.certificate.post_digest(),
            &one.state,
            &mut f.maps,
            &second,
            &OperationWitness::None,
        )
        .expect("should write 2");

        let replay = verify_transition(
            &f.ctx,
            two.certificate.post_digest(),
            &two.state,
            &mut f.maps,
            &first,
            &OperationWitness::None,
        );

        assert_eq!(
            replay,
            Err(Error::Transition(TransitionError::StaleScalar {
                scalar: Scalar::Sequence,
                declared: 0,
                live: 2,
            }))
        );
        assert_eq!(f.maps.vaults.get(&[5u8; 32]), Ok([2u8; 32]));
    }

    #[test]
    fn test_replayed_close_is_rejected() {
        let mut f = fixture();
        let pre = f.state.digest(f.ctx.hasher());
        let close = f.closer.prove(&f.ctx, Intent::anchored(IntentAction::CloseBlock, &f.state));
        let one = verify_transition(
            &f.ctx,
            &pre,
            &f.state,
            &mut f.maps,
            &close,
            &OperationWitness::None,
        )
        .expect("should close block 0");

        let replay = verify_transition(
            &f.ctx,
            one.certificate.post_digest(),
            &one.state,
            &mut f.maps,
            &close,
            &OperationWitness::None,
        );

        assert!(matches!(
            replay,
            Err(Error::Transition(TransitionError::StaleScalar {
                scalar: Scalar::BlockNumber,
                ..
            }))
        ));
        assert_eq!(f.maps.history.len() as u64, one.state.block_number);
    }

    #[test]
    fn test_unanchored_update_is_rejected() {
        let mut f = fixture();
        let pre = f.state.digest(f.ctx.hasher());
        let vault_root = f.maps.vaults.root();
        let action = IntentAction::DomainUpdate {
            sub_map: SubMap::Vaults,
            writes: vec![([5u8; 32], [1u8; 32])],
        };
        let proof = f.governor.prove(&f.ctx, Intent::new(action));

        let result = verify_transition(
            &f.ctx,
            &pre,
            &f.state,
            &mut f.maps,
            &proof,
            &OperationWitness::None,
        );

        assert_eq!(
            result,
            Err(Error::Transition(TransitionError::MissingAnchor {
                kind: OperationKind::DomainUpdate,
                scalar: Scalar::Sequence,
            }))
        );
        assert_eq!(f.maps.vaults.root(), vault_root);
    }
}
