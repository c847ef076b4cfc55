//! Confidential note ledger
//!
//! Commitments and nullifiers share one indexed merkle map, each stored as
//! `key -> INCLUDED`. Minting proves a commitment is fresh; spending proves
//! the note's commitment is included and its nullifier is not. All writes
//! of one transaction go through fixed-arity slots so dummy notes cost the
//! same as real ones and change nothing.

mod keys;
mod mint;
mod note;
mod spend;
mod transaction;

pub use keys::{Address, NullifierKey, SpendingKey};
pub use mint::{pad_outputs, verify_outputs, MintTally};
pub use note::Note;
pub use spend::{spend_message, Spend, SpendTally};
pub use transaction::{apply_ledger_writes, NoteTally, NoteTransaction, LEDGER_SLOTS};

use crate::types::MapKey;

/// One conditional ledger write
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerSlot {
    /// Commitment or nullifier to mark as included
    pub key: MapKey,
    /// False for dummy slots
    pub active: bool,
}

impl LedgerSlot {
    /// Slot that writes `key`
    pub fn active(key: MapKey) -> Self { Self { key, active: true } }

    /// Slot that writes nothing
    pub fn inactive() -> Self { Self { key: [0u8; 32], active: false } }
}
