#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Shielded Rollup
//!
//! State engine of a privacy-preserving stablecoin rollup: indexed merkle
//! maps with membership and non-membership proofs, a confidential note
//! ledger built on them, a per-operation state-transition verifier and a
//! merge engine that folds transition certificates into block proofs.

// Rollup configuration and the shared proving context
pub mod config;

// Error types
pub mod errors;

// Domain-separated hashing (Poseidon2 over BabyBear, SHA-256)
pub mod hash;

// Indexed merkle maps, witnesses, pruning and persistence
pub mod imm;

// Commitment/nullifier note ledger
pub mod ledger;

// Certificate merging and block building
pub mod merge;

// Settlement boundary
pub mod settlement;

// Rollup state record
pub mod state;

// Per-operation state-transition verifier
pub mod transition;

// Shared constants and aliases
pub mod types;

// Re-export commonly used types and functions
pub use config::{RollupConfig, RollupContext};
pub use errors::{Error, Result};
pub use hash::{MapHasher, Poseidon2Hasher, Sha256Hasher};
pub use imm::{IndexedMerkleMap, MapView, PruneRequest, PrunedMap};
pub use ledger::{Address, Note, NoteTransaction, SpendingKey};
pub use merge::{genesis_certificate, merge, merge_all, Block, BlockBuilder};
pub use state::{RollupState, Scalar, SubMap, SubMaps};
pub use settlement::{
    decode_payload, encode_payload, verify_emergency_settlement, verify_settlement,
    SettlementAuthorization, SettlementPayload,
};
pub use transition::{
    verify_transition, Intent, IntentAction, IntentProgram, IntentProof, OperationKind,
    OperationWitness, Precondition, TransitionCertificate, TransitionOutput, VerificationKey,
};
pub use types::Bytes32;
