//! Verification key registry
//!
//! The registry maps `H(vk)` to the [`OperationKind`] the program may
//! authorize. Its root lives in the state record, so the set of permitted
//! programs changes only through verified `RegisterProgram` transitions.

use super::intent::{OperationKind, VerificationKey};
use crate::errors::{Error, MapError, Result, TransitionError};
use crate::hash::MapHasher;
use crate::imm::{IndexedMerkleMap, MapView};
use crate::types::{MapKey, VERIFICATION_KEY_DOMAIN};

/// Registry key of a verification key
pub fn registry_key<H: MapHasher>(hasher: &H, vk: &VerificationKey) -> MapKey {
    hasher.hash_fields(VERIFICATION_KEY_DOMAIN, &[&vk.to_bytes()])
}

/// Permits `vk` to authorize `kind`, replacing any earlier permission
pub fn register_program<H: MapHasher>(
    registry: &mut IndexedMerkleMap<H>,
    vk: &VerificationKey,
    kind: OperationKind,
) -> Result<Option<OperationKind>> {
    let key = registry_key(registry.hasher(), vk);
    let previous = registry.set(key, kind.to_value())?;
    Ok(previous.and_then(|value| OperationKind::from_value(&value)))
}

/// Proves `vk` is registered for `kind`
///
/// # Errors
/// * `UnregisteredProgram` - The key is not in the registry
/// * `KindNotPermitted` - The key is registered for another kind
pub fn check_registered<V: MapView>(
    registry: &V,
    vk: &VerificationKey,
    kind: OperationKind,
) -> Result<()> {
    let key = registry_key(registry.hasher(), vk);
    let value = registry.assert_included(&key).map_err(|err| match err {
        Error::Map(MapError::KeyNotIncluded(_)) => {
            TransitionError::UnregisteredProgram(vk.to_bytes()).into()
        }
        other => other,
    })?;
    let registered = OperationKind::from_value(&value);
    if registered != Some(kind) {
        return Err(TransitionError::KindNotPermitted { registered, requested: kind }.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RollupConfig, RollupContext};
    use crate::hash::Sha256Hasher;
    use crate::transition::IntentProgram;

    fn setup() -> (IndexedMerkleMap<Sha256Hasher>, VerificationKey) {
        let ctx = RollupContext::with_hasher(RollupConfig::default(), Sha256Hasher)
            .expect("should build context");
        let program = IntentProgram::from_secret(&ctx, &[9u8; 32]).expect("should create program");
        let registry = IndexedMerkleMap::new(4, Sha256Hasher).expect("should create registry");
        (registry, program.verification_key())
    }

    #[test]
    fn test_registered_kind_is_accepted() {
        let (mut registry, vk) = setup();

        register_program(&mut registry, &vk, OperationKind::Mint).expect("should register");

        assert!(check_registered(&registry, &vk, OperationKind::Mint).is_ok());
    }

    #[test]
    fn test_unregistered_program_is_rejected() {
        let (registry, vk) = setup();

        let result = check_registered(&registry, &vk, OperationKind::Mint);

        assert_eq!(
            result,
            Err(Error::Transition(TransitionError::UnregisteredProgram(vk.to_bytes())))
        );
    }

    #[test]
    fn test_other_kind_is_rejected() {
        let (mut registry, vk) = setup();
        register_program(&mut registry, &vk, OperationKind::Transfer).expect("should register");

        let result = check_registered(&registry, &vk, OperationKind::Mint);

        assert_eq!(
            result,
            Err(Error::Transition(TransitionError::KindNotPermitted {
                registered: Some(OperationKind::Transfer),
                requested: OperationKind::Mint,
            }))
        );
    }

    #[test]
    fn test_reregistering_returns_previous_kind() {
        let (mut registry, vk) = setup();
        register_program(&mut registry, &vk, OperationKind::Transfer).expect("should register");

        let previous =
            register_program(&mut registry, &vk, OperationKind::Burn).expect("should register");

        assert_eq!(previous, Some(OperationKind::Transfer));
    }
}
