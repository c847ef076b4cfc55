//! Confidential notes

use super::keys::{Address, NullifierKey};
use crate::config::RollupContext;
use crate::hash::MapHasher;
use crate::types::{Bytes32, Commitment, Nullifier, NOTE_COMMITMENT_DOMAIN, NULLIFIER_DOMAIN};

/// A confidential note
///
/// Only its commitment is published when it is created and only its
/// nullifier when it is spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Note {
    /// Value carried by the note
    pub amount: u64,
    /// Owner of the note
    pub recipient: Address,
    /// Blinding secret, also the nullifier preimage
    pub secret: Bytes32,
    /// Uniqueness nonce
    pub nonce: Bytes32,
    /// Padding note without ledger side effects
    pub dummy: bool,
}

impl Note {
    /// Creates a real note
    pub fn new(amount: u64, recipient: Address, secret: Bytes32, nonce: Bytes32) -> Self {
        Self { amount, recipient, secret, nonce, dummy: false }
    }

    /// Creates a padding note owned by the context's dummy address
    pub fn dummy<H: MapHasher>(ctx: &RollupContext<H>) -> Self {
        Self {
            amount: 0,
            recipient: *ctx.dummy_address(),
            secret: [0u8; 32],
            nonce: [0u8; 32],
            dummy: true,
        }
    }

    /// Binding hash of every note field
    pub fn commitment<H: MapHasher>(&self, hasher: &H) -> Commitment {
        hasher.hash_fields(
            NOTE_COMMITMENT_DOMAIN,
            &[
                &self.amount.to_le_bytes(),
                &self.recipient.viewing_key,
                &self.recipient.spending_key.serialize(),
                &self.secret,
                &self.nonce,
                &[u8::from(self.dummy)],
            ],
        )
    }

    /// Nullifier published when the note is spent
    pub fn nullifier<H: MapHasher>(&self, hasher: &H, nullifier_key: &NullifierKey) -> Nullifier {
        hasher.hash_fields(NULLIFIER_DOMAIN, &[nullifier_key.as_bytes(), &self.secret])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RollupConfig;
    use crate::hash::Sha256Hasher;
    use crate::ledger::SpendingKey;

    fn context() -> RollupContext<Sha256Hasher> {
        RollupContext::with_hasher(RollupConfig::default(), Sha256Hasher)
            .expect("should build context")
    }

    #[test]
    fn test_commitment_binds_amount() {
        let ctx = context();
        let owner = SpendingKey::from_bytes(&[3u8; 32]).expect("should create key");
        let address = owner.address(ctx.secp(), ctx.hasher());
        let note = Note::new(100, address, [1u8; 32], [2u8; 32]);
        let richer = Note { amount: 101, ..note };

        assert_ne!(note.commitment(ctx.hasher()), richer.commitment(ctx.hasher()));
    }

    #[test]
    fn test_nullifier_depends_on_key() {
        let ctx = context();
        let owner = SpendingKey::from_bytes(&[3u8; 32]).expect("should create key");
        let other = SpendingKey::from_bytes(&[4u8; 32]).expect("should create key");
        let note = Note::new(5, owner.address(ctx.secp(), ctx.hasher()), [1u8; 32], [2u8; 32]);

        let nullifier = note.nullifier(ctx.hasher(), &owner.nullifier_key(ctx.hasher()));
        let forged = note.nullifier(ctx.hasher(), &other.nullifier_key(ctx.hasher()));

        assert_ne!(nullifier, forged);
        assert_ne!(nullifier, note.commitment(ctx.hasher()));
    }

    #[test]
    fn test_dummy_note() {
        let ctx = context();

        let note = Note::dummy(&ctx);

        assert!(note.dummy);
        assert_eq!(note.amount, 0);
        assert_eq!(note.recipient, *ctx.dummy_address());
    }
}
