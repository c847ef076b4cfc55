//! Per-operation deltas
//!
//! Every arm checks everything it needs before its first map write, so a
//! rejected operation leaves the maps untouched. Scalar changes go to a
//! working copy of the state record that the verifier drops on failure.

use std::collections::BTreeSet;

use super::history::record_snapshot;
use super::intent::{IntentAction, OperationKind};
use super::registry::register_program;
use crate::config::RollupContext;
use crate::errors::{Result, TransitionError};
use crate::hash::MapHasher;
use crate::imm::check_key;
use crate::ledger::{apply_ledger_writes, NoteTally, NoteTransaction};
use crate::state::{RollupState, Scalar, SubMap, SubMaps};
use crate::types::{Bytes32, Digest};

/// Private witness accompanying an intent
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationWitness {
    /// Note transaction for mint, transfer and burn
    Notes(NoteTransaction),
    /// Operations without a private witness
    None,
}

/// Verifies the note witness and checks it against the intent's binding
fn verified_notes<'w, H: MapHasher>(
    ctx: &RollupContext<H>,
    kind: OperationKind,
    binding: &Bytes32,
    witness: &'w OperationWitness,
    maps: &SubMaps<H>,
) -> Result<(&'w NoteTransaction, NoteTally)> {
    let OperationWitness::Notes(tx) = witness else {
        return Err(TransitionError::WitnessMismatch(kind).into());
    };
    if tx.binding_hash(ctx.hasher()) != *binding {
        return Err(TransitionError::BindingMismatch.into());
    }
    Ok((tx, tx.verify(ctx, maps.get(SubMap::Ledger))?))
}

fn require_no_witness(kind: OperationKind, witness: &OperationWitness) -> Result<()> {
    match witness {
        OperationWitness::None => Ok(()),
        OperationWitness::Notes(_) => Err(TransitionError::WitnessMismatch(kind).into()),
    }
}

fn not_conserved(tally: &NoteTally, burned: u64) -> TransitionError {
    TransitionError::ValueNotConserved {
        value_in: tally.value_in,
        value_out: tally.value_out,
        burned,
    }
}

/// Applies `action` to `state` and `maps`
///
/// `state` receives scalar changes only; the caller copies the new roots
/// in afterwards.
pub(crate) fn apply<H: MapHasher>(
    ctx: &RollupContext<H>,
    pre_digest: &Digest,
    action: &IntentAction,
    witness: &OperationWitness,
    state: &mut RollupState,
    maps: &mut SubMaps<H>,
) -> Result<()> {
    let kind = action.kind();
    match action {
        IntentAction::Mint { amount, binding } => {
            let (tx, tally) = verified_notes(ctx, kind, binding, witness, maps)?;
            if tx.spend.has_real_inputs() || tally.value_out != *amount {
                return Err(not_conserved(&tally, 0).into());
            }
            state.increase(Scalar::TotalSupply, *amount)?;
            apply_ledger_writes(maps.get_mut(SubMap::Ledger), &tally.slots)?;
        }
        IntentAction::Transfer { binding } => {
            let (_, tally) = verified_notes(ctx, kind, binding, witness, maps)?;
            if tally.value_in != tally.value_out {
                return Err(not_conserved(&tally, 0).into());
            }
            apply_ledger_writes(maps.get_mut(SubMap::Ledger), &tally.slots)?;
        }
        IntentAction::Burn { amount, binding } => {
            let (_, tally) = verified_notes(ctx, kind, binding, witness, maps)?;
            if tally.value_out.checked_add(*amount) != Some(tally.value_in) {
                return Err(not_conserved(&tally, *amount).into());
            }
            state.decrease(Scalar::TotalSupply, *amount)?;
            apply_ledger_writes(maps.get_mut(SubMap::Ledger), &tally.slots)?;
        }
        IntentAction::CloseBlock => {
            require_no_witness(kind, witness)?;
            let block = state.block_number;
            state.increase(Scalar::BlockNumber, 1)?;
            record_snapshot(maps.get_mut(SubMap::History), block, *pre_digest)?;
        }
        IntentAction::RegisterProgram { vk, kind: permitted } => {
            require_no_witness(kind, witness)?;
            register_program(maps.get_mut(SubMap::Registry), vk, *permitted)?;
        }
        IntentAction::DomainUpdate { sub_map, writes } => {
            require_no_witness(kind, witness)?;
            if sub_map.is_protected() {
                return Err(TransitionError::ProtectedSubMap(*sub_map).into());
            }
            let target = maps.get_mut(*sub_map);
            let mut fresh = BTreeSet::new();
            for (key, _) in writes {
                check_key(key)?;
                if !target.contains(key) {
                    fresh.insert(*key);
                }
            }
            target.reserve(fresh.len() as u64)?;
            for (key, value) in writes {
                target.set(*key, *value)?;
            }
        }
        IntentAction::EmergencySettle { .. } => {
            return Err(TransitionError::NotATransition(kind).into());
        }
    }
    Ok(())
}
