//! Error types for the shielded rollup
//!
//! This module defines all error types used throughout the library.
//! Structural errors (malformed maps, capacity overflow, bad configuration)
//! are raised before any proof is built; constraint violations make the
//! operation being verified unsatisfiable; misuse of read-only views fails
//! immediately. None of them leave a partial effect behind.

use thiserror::Error;

use crate::state::{Scalar, SubMap};
use crate::transition::OperationKind;

/// The main error type for the shielded rollup library
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Indexed merkle map errors
    #[error(transparent)]
    Map(#[from] MapError),

    /// Confidential note ledger errors
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Rollup state record errors
    #[error(transparent)]
    State(#[from] StateError),

    /// State transition verification errors
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Certificate merge errors
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// Settlement boundary errors
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised by indexed merkle maps and their pruned views
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MapError {
    /// Tree height outside the supported range
    #[error("Invalid tree height {height}: must be between 1 and {max}")]
    InvalidHeight {
        /// The requested height
        height: u8,
        /// The maximum supported height
        max: u8,
    },

    /// Key equal to one of the sentinels
    #[error("Key {} is reserved as a sentinel", hex::encode(.0))]
    KeyOutOfRange([u8; 32]),

    /// Membership required but the key is absent
    #[error("Key {} is not included", hex::encode(.0))]
    KeyNotIncluded([u8; 32]),

    /// Non-membership required but the key is present
    #[error("Key {} is already included", hex::encode(.0))]
    KeyAlreadyIncluded([u8; 32]),

    /// All leaf slots are in use
    #[error("Map of height {height} is full ({capacity} leaves)")]
    CapacityExceeded {
        /// Height of the full map
        height: u8,
        /// Number of leaf slots
        capacity: u64,
    },

    /// Mutation attempted on a read-only view
    #[error("Pruned map is read-only")]
    ReadOnly,

    /// A pruned map was queried outside the request it was built for
    #[error("No witness for key {} in pruned map", hex::encode(.0))]
    WitnessUnavailable([u8; 32]),

    /// A witness path does not hash to the expected root
    #[error("Witness does not match root {}", hex::encode(.0))]
    RootMismatch([u8; 32]),

    /// A membership witness names a different key
    #[error("Witness is for key {}, expected {}", hex::encode(.found), hex::encode(.expected))]
    KeyMismatch {
        /// The queried key
        expected: [u8; 32],
        /// The key carried by the witness
        found: [u8; 32],
    },

    /// The low leaf of a non-membership witness does not bracket the key
    #[error("Low leaf {} does not bracket key {}", hex::encode(.low_key), hex::encode(.key))]
    LowLeafNotAdjacent {
        /// The key whose absence is claimed
        key: [u8; 32],
        /// The key of the supplied low leaf
        low_key: [u8; 32],
    },

    /// A witness path has the wrong number of siblings
    #[error("Witness path has {actual} siblings, expected {expected}")]
    InvalidPathLength {
        /// Height of the map
        expected: usize,
        /// Length of the supplied path
        actual: usize,
    },

    /// Serialized map content violates a structural invariant
    #[error("Malformed map: {0}")]
    Malformed(String),

    /// Backing store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors raised by the confidential note ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    /// An input note was never minted (or the ledger view is stale)
    #[error("Input note {index} commitment is not in the ledger")]
    CommitmentNotIncluded {
        /// Input slot
        index: usize,
    },

    /// An input note was already spent
    #[error("Input note {index} nullifier is already in the ledger")]
    NullifierAlreadyIncluded {
        /// Input slot
        index: usize,
    },

    /// An output note commitment already exists
    #[error("Output note {index} commitment is already in the ledger")]
    CommitmentAlreadyIncluded {
        /// Output slot
        index: usize,
    },

    /// Two input slots spend the same note
    #[error("Input notes {first} and {second} share a nullifier")]
    DuplicateNullifier {
        /// First input slot
        first: usize,
        /// Second input slot
        second: usize,
    },

    /// Two output slots create the same note
    #[error("Output notes {first} and {second} share a commitment")]
    DuplicateCommitment {
        /// First output slot
        first: usize,
        /// Second output slot
        second: usize,
    },

    /// Real inputs are present but no spend authorization was supplied
    #[error("Spend authorization missing")]
    MissingAuthorization,

    /// The aggregate spend signature does not verify
    #[error("Invalid spend signature")]
    InvalidSignature,

    /// An input note is owned by someone other than the declared spender
    #[error("Input note {index} is not owned by the spender")]
    SpenderMismatch {
        /// Input slot
        index: usize,
    },

    /// The presented nullifier key does not belong to the note recipient
    #[error("Nullifier key does not match the recipient of input note {index}")]
    NullifierKeyMismatch {
        /// Input slot
        index: usize,
    },

    /// A dummy note carries value
    #[error("Dummy note in slot {index} has non-zero amount {amount}")]
    NonZeroDummy {
        /// Note slot
        index: usize,
        /// The offending amount
        amount: u64,
    },

    /// Note values overflow u64
    #[error("Note value overflow")]
    ValueOverflow,

    /// More notes than a transaction has slots for
    #[error("Too many notes: {actual} supplied, {max} slots")]
    TooManyNotes {
        /// Number of slots
        max: usize,
        /// Number of notes supplied
        actual: usize,
    },

    /// Invalid spending key bytes
    #[error("Invalid spending key")]
    InvalidSpendingKey,
}

/// Errors raised by the rollup state record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StateError {
    /// A supplied sub-map does not match the root recorded in the state
    #[error("Sub-map {0:?} does not match the state record")]
    SubMapRootMismatch(SubMap),

    /// A scalar counter cannot be incremented further
    #[error("Scalar {0:?} overflow")]
    ScalarOverflow(Scalar),

    /// A scalar counter cannot be decremented further
    #[error("Scalar {0:?} underflow")]
    ScalarUnderflow(Scalar),
}

/// Errors raised while verifying a state transition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransitionError {
    /// The supplied digest is not the digest of the supplied state
    #[error("State digest mismatch: expected {}, computed {}", hex::encode(.expected), hex::encode(.computed))]
    DigestMismatch {
        /// Digest the caller claims
        expected: [u8; 32],
        /// Digest of the supplied state
        computed: [u8; 32],
    },

    /// The intent proof does not verify
    #[error("Intent proof verification failed")]
    InvalidIntentProof,

    /// Program secret is not a valid key
    #[error("Invalid program key")]
    InvalidProgramKey,

    /// The intent's verification key is not in the registry
    #[error("Verification key {} is not registered", hex::encode(.0))]
    UnregisteredProgram([u8; 32]),

    /// The program is registered for a different operation
    #[error("Program is registered for {registered:?}, intent is {requested:?}")]
    KindNotPermitted {
        /// Kind recorded in the registry
        registered: Option<OperationKind>,
        /// Kind of the intent
        requested: OperationKind,
    },

    /// The intent does not pin the counter its kind requires
    #[error("{kind:?} intent must declare a {scalar:?} precondition")]
    MissingAnchor {
        /// Kind of the intent
        kind: OperationKind,
        /// Scalar the intent must declare
        scalar: Scalar,
    },

    /// A declared sub-map root differs from the live state
    #[error("Precondition on {0:?} root is stale")]
    StaleRoot(SubMap),

    /// A declared scalar differs from the live state
    #[error("Precondition on {scalar:?} is stale: declared {declared}, live {live}")]
    StaleScalar {
        /// The scalar
        scalar: Scalar,
        /// Value the intent declared
        declared: u64,
        /// Value in the current state
        live: u64,
    },

    /// A cited snapshot digest is not the recorded one
    #[error("Snapshot for block {0} does not match the history")]
    SnapshotMismatch(u64),

    /// A cited snapshot is not old enough
    #[error("Snapshot block {snapshot} is too recent: current block {current}, cooldown {cooldown}")]
    SnapshotTooRecent {
        /// Block of the cited snapshot
        snapshot: u64,
        /// Current block number
        current: u64,
        /// Required age in blocks
        cooldown: u64,
    },

    /// The operation witness does not fit the intent
    #[error("Operation witness does not match the {0:?} intent")]
    WitnessMismatch(OperationKind),

    /// The note transaction is not the one the intent commits to
    #[error("Note transaction binding mismatch")]
    BindingMismatch,

    /// Value in and value out do not balance
    #[error("Value not conserved: in {value_in}, out {value_out}, burned {burned}")]
    ValueNotConserved {
        /// Sum of input notes (or minted amount)
        value_in: u64,
        /// Sum of output notes
        value_out: u64,
        /// Amount removed from circulation
        burned: u64,
    },

    /// A generic write addressed a sub-map with its own protocol
    #[error("Sub-map {0:?} cannot be written by domain updates")]
    ProtectedSubMap(SubMap),

    /// The intent does not describe a state transition
    #[error("{0:?} is not a state transition")]
    NotATransition(OperationKind),
}

/// Errors raised while merging transition certificates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MergeError {
    /// The left certificate does not end where the right one starts
    #[error("Certificates are not adjacent: left ends at {}, right starts at {}", hex::encode(.left_post), hex::encode(.right_pre))]
    NotAdjacent {
        /// Post-digest of the left certificate
        left_post: [u8; 32],
        /// Pre-digest of the right certificate
        right_pre: [u8; 32],
    },

    /// The certificates were checked against different registries
    #[error("Certificates use different registry roots")]
    RegistryMismatch,

    /// Combined length overflows
    #[error("Certificate length overflow")]
    LengthOverflow,

    /// Nothing to merge
    #[error("No certificates to merge")]
    Empty,

    /// Genesis requested for a state that is not at sequence zero
    #[error("Genesis state must have sequence 0, found {0}")]
    NotGenesis(u64),
}

/// Errors raised at the settlement boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettlementError {
    /// Settlement payload has the wrong length
    #[error("Settlement payload must be exactly {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// Settlement payload has the wrong magic bytes
    #[error("Invalid settlement magic bytes")]
    InvalidMagic,

    /// Settlement payload has an unknown version
    #[error("Unsupported settlement version: {0}")]
    UnsupportedVersion(u8),

    /// The operator signature does not cover this certificate
    #[error("Settlement authorization does not verify")]
    InvalidAuthorization,

    /// The emergency intent does not name this certificate
    #[error("Emergency settlement intent does not match the certificate")]
    EmergencyMismatch,
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A map height is out of range
    #[error("Invalid {name}: {height} (must be between 1 and {max})")]
    InvalidHeight {
        /// Name of the configuration field
        name: &'static str,
        /// Configured height
        height: u8,
        /// Maximum supported height
        max: u8,
    },

    /// Snapshot cooldown must be at least one block
    #[error("Snapshot cooldown must be at least 1 block")]
    ZeroCooldown,

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Parse(String),
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
