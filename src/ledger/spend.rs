//! Spend side of the note protocol
//!
//! A spend consumes up to three notes. Each real input must be in the
//! ledger, owned by the declared spender and not yet nullified. One Schnorr
//! signature over the commitments of all three slots authorizes the whole
//! spend. Dummy inputs carry no value and skip every ledger check.

use bitcoin::secp256k1::schnorr::Signature;
use bitcoin::secp256k1::{Message, XOnlyPublicKey};

use super::keys::{NullifierKey, SpendingKey};
use super::note::Note;
use super::LedgerSlot;
use crate::config::RollupContext;
use crate::errors::{Error, LedgerError, MapError, Result};
use crate::hash::MapHasher;
use crate::imm::MapView;
use crate::types::{Bytes32, MAX_INPUT_NOTES, SPEND_AUTH_DOMAIN};

/// Input half of a note transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spend {
    /// Input slots, dummies included
    pub inputs: [Note; MAX_INPUT_NOTES],
    /// Key that must own every real input
    pub spender: XOnlyPublicKey,
    /// Nullifier key of the spender
    pub nullifier_key: NullifierKey,
    /// Aggregate authorization, required when any input is real
    pub signature: Option<Signature>,
}

/// Verified totals of a spend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpendTally {
    /// Sum of real input amounts
    pub value_in: u64,
    /// Nullifiers to insert, inactive for dummy slots
    pub nullifiers: [LedgerSlot; MAX_INPUT_NOTES],
}

/// Message signed to authorize a spend
pub fn spend_message<H: MapHasher>(hasher: &H, inputs: &[Note; MAX_INPUT_NOTES]) -> Bytes32 {
    let commitments = inputs.map(|note| note.commitment(hasher));
    hasher.hash_fields(SPEND_AUTH_DOMAIN, &[&commitments[0], &commitments[1], &commitments[2]])
}

impl Spend {
    /// Spend with only dummy inputs
    pub fn empty<H: MapHasher>(ctx: &RollupContext<H>) -> Self {
        let dummy = Note::dummy(ctx);
        Self {
            inputs: [dummy; MAX_INPUT_NOTES],
            spender: ctx.dummy_address().spending_key,
            nullifier_key: ctx.dummy_key().nullifier_key(ctx.hasher()),
            signature: None,
        }
    }

    /// Builds and signs a spend of up to three notes owned by `key`
    ///
    /// Missing slots are padded with dummy notes.
    ///
    /// # Arguments
    /// * `ctx` - Shared rollup context
    /// * `notes` - Notes to spend (at most three)
    /// * `key` - Spending key of the notes' owner
    pub fn sign<H: MapHasher>(
        ctx: &RollupContext<H>,
        notes: &[Note],
        key: &SpendingKey,
    ) -> Result<Self> {
        if notes.len() > MAX_INPUT_NOTES {
            return Err(
                LedgerError::TooManyNotes { max: MAX_INPUT_NOTES, actual: notes.len() }.into()
            );
        }
        let mut inputs = [Note::dummy(ctx); MAX_INPUT_NOTES];
        inputs[..notes.len()].copy_from_slice(notes);

        let message = Message::from_digest(spend_message(ctx.hasher(), &inputs));
        let signature = ctx.secp().sign_schnorr_no_aux_rand(&message, &key.keypair(ctx.secp()));
        Ok(Self {
            inputs,
            spender: key.public_key(ctx.secp()),
            nullifier_key: key.nullifier_key(ctx.hasher()),
            signature: Some(signature),
        })
    }

    /// Returns true if any input is a real note
    pub fn has_real_inputs(&self) -> bool { self.inputs.iter().any(|note| !note.dummy) }

    /// Runs every spend check against a ledger view
    ///
    /// # Errors
    /// The first violated check: non-zero dummy, missing or invalid
    /// signature, foreign input, wrong nullifier key, unknown commitment,
    /// spent nullifier, repeated nullifier or value overflow.
    pub fn verify<H, V>(&self, ctx: &RollupContext<H>, ledger: &V) -> Result<SpendTally>
    where
        H: MapHasher,
        V: MapView,
    {
        let hasher = ctx.hasher();
        for (index, note) in self.inputs.iter().enumerate() {
            if note.dummy && note.amount != 0 {
                return Err(LedgerError::NonZeroDummy { index, amount: note.amount }.into());
            }
        }
        if self.has_real_inputs() {
            let signature = self.signature.ok_or(LedgerError::MissingAuthorization)?;
            let message = Message::from_digest(spend_message(hasher, &self.inputs));
            ctx.secp()
                .verify_schnorr(&signature, &message, &self.spender)
                .map_err(|_| LedgerError::InvalidSignature)?;
        }

        let viewing_key = self.nullifier_key.viewing_key(hasher);
        let mut value_in = 0u64;
        let mut nullifiers = [LedgerSlot::inactive(); MAX_INPUT_NOTES];
        for (index, note) in self.inputs.iter().enumerate() {
            if note.dummy {
                continue;
            }
            if note.recipient.spending_key != self.spender {
                return Err(LedgerError::SpenderMismatch { index }.into());
            }
            if note.recipient.viewing_key != viewing_key {
                return Err(LedgerError::NullifierKeyMismatch { index }.into());
            }

            ledger.assert_included(&note.commitment(hasher)).map_err(|err| match err {
                Error::Map(MapError::KeyNotIncluded(_)) => {
                    LedgerError::CommitmentNotIncluded { index }.into()
                }
                other => other,
            })?;

            let nullifier = note.nullifier(hasher, &self.nullifier_key);
            let repeated = nullifiers.iter().position(|slot| slot.active && slot.key == nullifier);
            if let Some(first) = repeated {
                return Err(LedgerError::DuplicateNullifier { first, second: index }.into());
            }
            ledger.assert_not_included(&nullifier).map_err(|err| match err {
                Error::Map(MapError::KeyAlreadyIncluded(_)) => {
                    LedgerError::NullifierAlreadyIncluded { index }.into()
                }
                other => other,
            })?;

            value_in = value_in.checked_add(note.amount).ok_or(LedgerError::ValueOverflow)?;
            nullifiers[index] = LedgerSlot::active(nullifier);
        }
        Ok(SpendTally { value_in, nullifiers })
    }
}
