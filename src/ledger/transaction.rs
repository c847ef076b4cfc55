//! Fixed-arity note transactions

use tracing::debug;

use super::mint::{pad_outputs, verify_outputs};
use super::note::Note;
use super::spend::Spend;
use super::LedgerSlot;
use crate::config::RollupContext;
use crate::errors::Result;
use crate::hash::MapHasher;
use crate::imm::{IndexedMerkleMap, MapView};
use crate::types::{Bytes32, INCLUDED, MAX_INPUT_NOTES, MAX_OUTPUT_NOTES, NOTE_BINDING_DOMAIN};

/// Number of ledger writes a transaction can make
pub const LEDGER_SLOTS: usize = MAX_INPUT_NOTES + MAX_OUTPUT_NOTES;

/// Three inputs and two outputs, padded with dummy notes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteTransaction {
    /// Input half
    pub spend: Spend,
    /// Output slots
    pub outputs: [Note; MAX_OUTPUT_NOTES],
}

/// Verified tallies of a note transaction
///
/// Value conservation is not checked here; callers compare the tallies
/// against whatever their operation mints or burns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteTally {
    /// Sum of real input amounts
    pub value_in: u64,
    /// Sum of real output amounts
    pub value_out: u64,
    /// Nullifier writes followed by commitment writes
    pub slots: [LedgerSlot; LEDGER_SLOTS],
}

impl NoteTransaction {
    /// Transaction creating notes from nothing (all inputs dummy)
    pub fn mint<H: MapHasher>(ctx: &RollupContext<H>, outputs: &[Note]) -> Result<Self> {
        Ok(Self { spend: Spend::empty(ctx), outputs: pad_outputs(ctx, outputs)? })
    }

    /// Transaction spending `spend` into up to two outputs
    pub fn transfer<H: MapHasher>(
        ctx: &RollupContext<H>,
        spend: Spend,
        outputs: &[Note],
    ) -> Result<Self> {
        Ok(Self { spend, outputs: pad_outputs(ctx, outputs)? })
    }

    /// Hash of every input and output commitment
    ///
    /// Intents carry this value so the public output is bound to the
    /// private note witness.
    pub fn binding_hash<H: MapHasher>(&self, hasher: &H) -> Bytes32 {
        let inputs = self.spend.inputs.map(|note| note.commitment(hasher));
        let outputs = self.outputs.map(|note| note.commitment(hasher));
        hasher.hash_fields(
            NOTE_BINDING_DOMAIN,
            &[&inputs[0], &inputs[1], &inputs[2], &outputs[0], &outputs[1]],
        )
    }

    /// Verifies both halves against one ledger snapshot
    pub fn verify<H, V>(&self, ctx: &RollupContext<H>, ledger: &V) -> Result<NoteTally>
    where
        H: MapHasher,
        V: MapView,
    {
        let spend = self.spend.verify(ctx, ledger)?;
        let mint = verify_outputs(ctx, ledger, &self.outputs)?;

        let mut slots = [LedgerSlot::inactive(); LEDGER_SLOTS];
        slots[..MAX_INPUT_NOTES].copy_from_slice(&spend.nullifiers);
        slots[MAX_INPUT_NOTES..].copy_from_slice(&mint.commitments);
        Ok(NoteTally { value_in: spend.value_in, value_out: mint.value_out, slots })
    }
}

/// Writes the active slots of a verified transaction into the ledger
///
/// Capacity for every active slot is reserved first, so either all writes
/// happen or none do.
pub fn apply_ledger_writes<H: MapHasher>(
    ledger: &mut IndexedMerkleMap<H>,
    slots: &[LedgerSlot],
) -> Result<Bytes32> {
    let active = slots.iter().filter(|slot| slot.active).count() as u64;
    ledger.reserve(active)?;
    for slot in slots {
        ledger.set_if(slot.active, slot.key, INCLUDED)?;
    }
    debug!(writes = active, "ledger updated");
    Ok(ledger.root())
}
