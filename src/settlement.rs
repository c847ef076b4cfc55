//! Settlement boundary
//!
//! The settlement contract sees only a merged certificate, the sequence
//! number of its post state and one of two authorizations:
//! - an operator signature over `(sequence, post_digest)`
//! - an emergency intent proof by a program registered for
//!   [`OperationKind::EmergencySettle`], used when the operator is absent

use bitcoin::secp256k1::schnorr::Signature;
use bitcoin::secp256k1::{Keypair, Message, XOnlyPublicKey};
use tracing::{debug, warn};

use crate::config::RollupContext;
use crate::errors::{MapError, Result, SettlementError};
use crate::hash::MapHasher;
use crate::imm::MapView;
use crate::transition::{
    check_registered, IntentAction, IntentProof, OperationKind, TransitionCertificate,
};
use crate::types::{
    Bytes32, Digest, SETTLEMENT_COUNTER_LEN, SETTLEMENT_DOMAIN, SETTLEMENT_MAGIC_BYTES,
    SETTLEMENT_OFFSET_LENGTH, SETTLEMENT_OFFSET_MAGIC, SETTLEMENT_OFFSET_POST,
    SETTLEMENT_OFFSET_PRE, SETTLEMENT_OFFSET_REGISTRY, SETTLEMENT_OFFSET_SEQUENCE,
    SETTLEMENT_OFFSET_VERSION, SETTLEMENT_TOTAL_LEN, SETTLEMENT_VERSION,
};

/// Decoded settlement payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementPayload {
    /// Digest the settled run starts from
    pub pre_digest: Digest,
    /// Digest the settled run ends at
    pub post_digest: Digest,
    /// Registry root of the run
    pub registry_root: Bytes32,
    /// Number of transitions in the run
    pub length: u64,
    /// Sequence number of the post state
    pub sequence: u64,
}

/// Encodes a certificate for the settlement contract
pub fn encode_payload(
    certificate: &TransitionCertificate,
    sequence: u64,
) -> [u8; SETTLEMENT_TOTAL_LEN] {
    let mut payload = [0u8; SETTLEMENT_TOTAL_LEN];
    payload[SETTLEMENT_OFFSET_MAGIC..SETTLEMENT_OFFSET_VERSION]
        .copy_from_slice(SETTLEMENT_MAGIC_BYTES);
    payload[SETTLEMENT_OFFSET_VERSION] = SETTLEMENT_VERSION;
    payload[SETTLEMENT_OFFSET_PRE..SETTLEMENT_OFFSET_POST]
        .copy_from_slice(certificate.pre_digest());
    payload[SETTLEMENT_OFFSET_POST..SETTLEMENT_OFFSET_REGISTRY]
        .copy_from_slice(certificate.post_digest());
    payload[SETTLEMENT_OFFSET_REGISTRY..SETTLEMENT_OFFSET_LENGTH]
        .copy_from_slice(certificate.registry_root());
    payload[SETTLEMENT_OFFSET_LENGTH..SETTLEMENT_OFFSET_SEQUENCE]
        .copy_from_slice(&certificate.length().to_le_bytes());
    payload[SETTLEMENT_OFFSET_SEQUENCE..].copy_from_slice(&sequence.to_le_bytes());
    payload
}

fn field<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}

/// Decodes a settlement payload
///
/// # Errors
/// * `InvalidLength` - The payload is not exactly [`SETTLEMENT_TOTAL_LEN`] bytes
/// * `InvalidMagic` - The payload does not start with the magic bytes
/// * `UnsupportedVersion` - The version byte is unknown
pub fn decode_payload(bytes: &[u8]) -> Result<SettlementPayload> {
    if bytes.len() != SETTLEMENT_TOTAL_LEN {
        return Err(SettlementError::InvalidLength {
            expected: SETTLEMENT_TOTAL_LEN,
            actual: bytes.len(),
        }
        .into());
    }
    if &bytes[SETTLEMENT_OFFSET_MAGIC..SETTLEMENT_OFFSET_VERSION] != SETTLEMENT_MAGIC_BYTES {
        return Err(SettlementError::InvalidMagic.into());
    }
    let version = bytes[SETTLEMENT_OFFSET_VERSION];
    if version != SETTLEMENT_VERSION {
        return Err(SettlementError::UnsupportedVersion(version).into());
    }
    Ok(SettlementPayload {
        pre_digest: field(bytes, SETTLEMENT_OFFSET_PRE),
        post_digest: field(bytes, SETTLEMENT_OFFSET_POST),
        registry_root: field(bytes, SETTLEMENT_OFFSET_REGISTRY),
        length: u64::from_le_bytes(field::<SETTLEMENT_COUNTER_LEN>(
            bytes,
            SETTLEMENT_OFFSET_LENGTH,
        )),
        sequence: u64::from_le_bytes(field::<SETTLEMENT_COUNTER_LEN>(
            bytes,
            SETTLEMENT_OFFSET_SEQUENCE,
        )),
    })
}

fn settlement_message<H: MapHasher>(hasher: &H, sequence: u64, post_digest: &Digest) -> Message {
    Message::from_digest(
        hasher.hash_fields(SETTLEMENT_DOMAIN, &[&sequence.to_le_bytes(), post_digest]),
    )
}

/// Operator signature authorizing settlement of one post state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementAuthorization {
    /// Schnorr signature over the settlement message
    pub signature: Signature,
}

impl SettlementAuthorization {
    /// Signs `(sequence, post_digest)` with the operator key
    pub fn sign<H: MapHasher>(
        ctx: &RollupContext<H>,
        operator: &Keypair,
        sequence: u64,
        post_digest: &Digest,
    ) -> Self {
        let message = settlement_message(ctx.hasher(), sequence, post_digest);
        Self { signature: ctx.secp().sign_schnorr_no_aux_rand(&message, operator) }
    }
}

/// Checks the operator signature for settling `certificate` at `sequence`
pub fn verify_settlement<H: MapHasher>(
    ctx: &RollupContext<H>,
    certificate: &TransitionCertificate,
    sequence: u64,
    authorization: &SettlementAuthorization,
    operator: &XOnlyPublicKey,
) -> Result<()> {
    let message = settlement_message(ctx.hasher(), sequence, certificate.post_digest());
    ctx.secp().verify_schnorr(&authorization.signature, &message, operator).map_err(|_| {
        warn!(sequence, "settlement authorization rejected");
        SettlementError::InvalidAuthorization
    })?;
    debug!(sequence, length = certificate.length(), "settlement authorized");
    Ok(())
}

/// Accepts `certificate` through the emergency path
///
/// `registry` must be a view of the registry the certificate was checked
/// against; a pruned map holding only the program's entry is enough.
///
/// # Errors
/// * `RootMismatch` - `registry` is not the certificate's registry
/// * `InvalidIntentProof` - The proof does not verify
/// * `EmergencyMismatch` - The intent names another certificate
/// * `UnregisteredProgram` / `KindNotPermitted` - The program may not settle
pub fn verify_emergency_settlement<H: MapHasher, V: MapView>(
    ctx: &RollupContext<H>,
    certificate: &TransitionCertificate,
    sequence: u64,
    proof: &IntentProof,
    registry: &V,
) -> Result<()> {
    if registry.root() != *certificate.registry_root() {
        return Err(MapError::RootMismatch(*certificate.registry_root()).into());
    }
    let intent = proof.verify(ctx)?;
    match intent.action {
        IntentAction::EmergencySettle { sequence: declared, post_digest }
            if declared == sequence && post_digest == *certificate.post_digest() => {}
        _ => return Err(SettlementError::EmergencyMismatch.into()),
    }
    check_registered(registry, &proof.vk, OperationKind::EmergencySettle)?;
    debug!(sequence, "emergency settlement authorized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RollupConfig;
    use crate::errors::{Error, TransitionError};
    use crate::hash::Sha256Hasher;
    use crate::imm::{IndexedMerkleMap, PruneRequest};
    use crate::merge::genesis_certificate;
    use crate::state::{RollupState, SubMaps};
    use crate::transition::{register_program, registry_key, Intent, IntentProgram};

    struct Fixture {
        ctx: RollupContext<Sha256Hasher>,
        maps: SubMaps<Sha256Hasher>,
        certificate: TransitionCertificate,
        guardian: IntentProgram,
    }

    fn fixture() -> Fixture {
        let ctx = RollupContext::with_hasher(RollupConfig::default(), Sha256Hasher)
            .expect("should build context");
        let mut maps = SubMaps::genesis(&ctx).expect("should create maps");
        let guardian =
            IntentProgram::from_secret(&ctx, &[7u8; 32]).expect("should create program");
        register_program(
            &mut maps.registry,
            &guardian.verification_key(),
            OperationKind::EmergencySettle,
        )
        .expect("should register guardian");
        let state = RollupState::from_maps(&maps);
        let certificate =
            genesis_certificate(&ctx, &state, &maps).expect("should certify genesis");
        Fixture { ctx, maps, certificate, guardian }
    }

    fn emergency(f: &Fixture, sequence: u64, post_digest: Digest) -> IntentProof {
        let intent = Intent::new(IntentAction::EmergencySettle { sequence, post_digest });
        f.guardian.prove(&f.ctx, intent)
    }

    #[test]
    fn test_payload_round_trip() {
        let f = fixture();

        let payload = encode_payload(&f.certificate, 9);
        let decoded = decode_payload(&payload).expect("should decode payload");

        assert_eq!(&payload[..4], SETTLEMENT_MAGIC_BYTES);
        assert_eq!(&decoded.pre_digest, f.certificate.pre_digest());
        assert_eq!(&decoded.post_digest, f.certificate.post_digest());
        assert_eq!(&decoded.registry_root, f.certificate.registry_root());
        assert_eq!(decoded.length, 0);
        assert_eq!(decoded.sequence, 9);
    }

    #[test]
    fn test_malformed_payloads_are_rejected() {
        let f = fixture();
        let payload = encode_payload(&f.certificate, 9);
        let mut wrong_magic = payload;
        wrong_magic[0] = 0xff;
        let mut wrong_version = payload;
        wrong_version[SETTLEMENT_OFFSET_VERSION] = 9;

        assert_eq!(
            decode_payload(&payload[1..]),
            Err(Error::Settlement(SettlementError::InvalidLength {
                expected: SETTLEMENT_TOTAL_LEN,
                actual: SETTLEMENT_TOTAL_LEN - 1,
            }))
        );
        assert_eq!(
            decode_payload(&wrong_magic),
            Err(Error::Settlement(SettlementError::InvalidMagic))
        );
        assert_eq!(
            decode_payload(&wrong_version),
            Err(Error::Settlement(SettlementError::UnsupportedVersion(9)))
        );
    }

    #[test]
    fn test_operator_signature() {
        let f = fixture();
        let operator =
            Keypair::from_seckey_slice(f.ctx.secp(), &[8u8; 32]).expect("should build keypair");
        let public = operator.x_only_public_key().0;
        let auth = SettlementAuthorization::sign(&f.ctx, &operator, 0, f.certificate.post_digest());

        assert!(verify_settlement(&f.ctx, &f.certificate, 0, &auth, &public).is_ok());
        assert_eq!(
            verify_settlement(&f.ctx, &f.certificate, 1, &auth, &public),
            Err(Error::Settlement(SettlementError::InvalidAuthorization))
        );
    }

    #[test]
    fn test_emergency_with_pruned_registry() {
        let f = fixture();
        let key = registry_key(f.ctx.hasher(), &f.guardian.verification_key());
        let request = PruneRequest::new().include(key);
        let registry = f.maps.registry.prune(&request).expect("should prune registry");
        let proof = emergency(&f, 0, *f.certificate.post_digest());

        let result = verify_emergency_settlement(&f.ctx, &f.certificate, 0, &proof, &registry);

        assert!(result.is_ok());
    }

    #[test]
    fn test_emergency_for_other_state_is_rejected() {
        let f = fixture();
        let proof = emergency(&f, 0, [1u8; 32]);

        let result =
            verify_emergency_settlement(&f.ctx, &f.certificate, 0, &proof, &f.maps.registry);

        assert_eq!(result, Err(Error::Settlement(SettlementError::EmergencyMismatch)));
    }

    #[test]
    fn test_emergency_by_unregistered_program_is_rejected() {
        let f = fixture();
        let stranger =
            IntentProgram::from_secret(&f.ctx, &[9u8; 32]).expect("should create program");
        let proof = stranger.prove(
            &f.ctx,
            Intent::new(IntentAction::EmergencySettle {
                sequence: 0,
                post_digest: *f.certificate.post_digest(),
            }),
        );

        let result =
            verify_emergency_settlement(&f.ctx, &f.certificate, 0, &proof, &f.maps.registry);

        assert!(matches!(
            result,
            Err(Error::Transition(TransitionError::UnregisteredProgram(_)))
        ));
    }

    #[test]
    fn test_emergency_against_other_registry_is_rejected() {
        let f = fixture();
        let other = IndexedMerkleMap::new(4, Sha256Hasher).expect("should create registry");
        let proof = emergency(&f, 0, *f.certificate.post_digest());

        let result = verify_emergency_settlement(&f.ctx, &f.certificate, 0, &proof, &other);

        assert!(matches!(result, Err(Error::Map(MapError::RootMismatch(_)))));
    }
}
