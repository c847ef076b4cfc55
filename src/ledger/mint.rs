//! Output side of the note protocol

use super::note::Note;
use super::LedgerSlot;
use crate::config::RollupContext;
use crate::errors::{Error, LedgerError, MapError, Result};
use crate::hash::MapHasher;
use crate::imm::MapView;
use crate::types::MAX_OUTPUT_NOTES;

/// Verified totals of a set of outputs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MintTally {
    /// Sum of real output amounts
    pub value_out: u64,
    /// Commitments to insert, inactive for dummy slots
    pub commitments: [LedgerSlot; MAX_OUTPUT_NOTES],
}

/// Pads up to two notes into the fixed output slots
pub fn pad_outputs<H: MapHasher>(
    ctx: &RollupContext<H>,
    notes: &[Note],
) -> Result<[Note; MAX_OUTPUT_NOTES]> {
    if notes.len() > MAX_OUTPUT_NOTES {
        return Err(LedgerError::TooManyNotes { max: MAX_OUTPUT_NOTES, actual: notes.len() }.into());
    }
    let mut outputs = [Note::dummy(ctx); MAX_OUTPUT_NOTES];
    outputs[..notes.len()].copy_from_slice(notes);
    Ok(outputs)
}

/// Checks every real output is fresh and tallies the minted value
///
/// # Errors
/// `NonZeroDummy`, `CommitmentAlreadyIncluded`, `DuplicateCommitment` or
/// `ValueOverflow`.
pub fn verify_outputs<H, V>(
    ctx: &RollupContext<H>,
    ledger: &V,
    outputs: &[Note; MAX_OUTPUT_NOTES],
) -> Result<MintTally>
where
    H: MapHasher,
    V: MapView,
{
    let mut value_out = 0u64;
    let mut commitments = [LedgerSlot::inactive(); MAX_OUTPUT_NOTES];
    for (index, note) in outputs.iter().enumerate() {
        if note.dummy {
            if note.amount != 0 {
                return Err(LedgerError::NonZeroDummy { index, amount: note.amount }.into());
            }
            continue;
        }

        let commitment = note.commitment(ctx.hasher());
        if let Some(first) =
            commitments.iter().position(|slot| slot.active && slot.key == commitment)
        {
            return Err(LedgerError::DuplicateCommitment { first, second: index }.into());
        }
        ledger.assert_not_included(&commitment).map_err(|err| match err {
            Error::Map(MapError::KeyAlreadyIncluded(_)) => {
                LedgerError::CommitmentAlreadyIncluded { index }.into()
            }
            other => other,
        })?;

        value_out = value_out.checked_add(note.amount).ok_or(LedgerError::ValueOverflow)?;
        commitments[index] = LedgerSlot::active(commitment);
    }
    Ok(MintTally { value_out, commitments })
}
