//! Core type definitions for the shielded rollup
//!
//! This module defines fundamental types and constants used across multiple
//! modules, providing a common location for shared definitions.

// ============================================================================
// Fundamental Types
// ============================================================================

/// Type alias for 32-byte arrays used across cryptographic operations
pub type Bytes32 = [u8; 32];

/// Type alias for indexed merkle map keys
pub type MapKey = Bytes32;

/// Type alias for indexed merkle map values
pub type MapValue = Bytes32;

/// Type alias for digests summarizing a whole structure
pub type Digest = Bytes32;

// ============================================================================
// Indexed Merkle Map Domain
// ============================================================================

/// Smallest key, held by the sentinel leaf every map starts with
pub const MIN_KEY: MapKey = [0u8; 32];

/// Largest key, used as the `next_key` of the greatest included leaf
pub const MAX_KEY: MapKey = [0xffu8; 32];

/// Maximum supported tree height (capacity `2^63` leaf slots)
pub const MAX_TREE_HEIGHT: u8 = 63;

/// Value stored for presence-only markers (commitments, nullifiers, history flags)
pub const INCLUDED: MapValue = {
    let mut value = [0u8; 32];
    value[31] = 1;
    value
};

/// Prefix byte of keys derived from sequential indices
///
/// Keeps index-derived keys strictly between the two sentinels.
pub const INDEX_KEY_PREFIX: u8 = 0x01;

/// Domain separation tag for leaf hashes
pub const IMM_LEAF_DOMAIN: &[u8] = b"SR_IMM_LEAF_v0";

/// Domain separation tag for internal node hashes
pub const IMM_NODE_DOMAIN: &[u8] = b"SR_IMM_NODE_v0";

// ============================================================================
// Note Ledger Domain
// ============================================================================

/// Type alias for note commitments
pub type Commitment = Bytes32;

/// Type alias for note nullifiers
pub type Nullifier = Bytes32;

/// Number of input note slots in every note transaction
pub const MAX_INPUT_NOTES: usize = 3;

/// Number of output note slots in every note transaction
pub const MAX_OUTPUT_NOTES: usize = 2;

/// Domain separation tag for note commitments
pub const NOTE_COMMITMENT_DOMAIN: &[u8] = b"SR_NOTE_CM_v0";

/// Domain separation tag for nullifiers
pub const NULLIFIER_DOMAIN: &[u8] = b"SR_NOTE_NF_v0";

/// Domain separation tag for nullifier key derivation
pub const NULLIFIER_KEY_DOMAIN: &[u8] = b"SR_KEY_NK_v0";

/// Domain separation tag for viewing key derivation
pub const VIEWING_KEY_DOMAIN: &[u8] = b"SR_KEY_VK_v0";

/// Domain separation tag for the aggregate spend authorization message
pub const SPEND_AUTH_DOMAIN: &[u8] = b"SR_SPEND_AUTH_v0";

/// Domain separation tag for note transaction binding hashes
pub const NOTE_BINDING_DOMAIN: &[u8] = b"SR_NOTE_BIND_v0";

/// Seed of the dummy spending key used to pad unused note slots
pub const DUMMY_KEY_SEED: Bytes32 = [0x42u8; 32];

// ============================================================================
// State Transition Domain
// ============================================================================

/// Domain separation tag for rollup state digests
pub const STATE_DIGEST_DOMAIN: &[u8] = b"SR_STATE_v0";

/// Domain separation tag for intent public outputs
pub const INTENT_DOMAIN: &[u8] = b"SR_INTENT_v0";

/// Domain separation tag for verification key registry entries
pub const VERIFICATION_KEY_DOMAIN: &[u8] = b"SR_VK_v0";

// ============================================================================
// Settlement Payload Format
// ============================================================================

/// Domain separation tag for settlement authorization messages
pub const SETTLEMENT_DOMAIN: &[u8] = b"SR_SETTLE_v0";

/// Magic bytes for the settlement payload: "SRST" (Shielded Rollup SeTtlement)
pub const SETTLEMENT_MAGIC_BYTES: &[u8; 4] = b"SRST";

// Length constants
/// Length of magic bytes in the settlement payload
pub const SETTLEMENT_MAGIC_LEN: usize = 4;
/// Current version of the settlement payload format
pub const SETTLEMENT_VERSION: u8 = 0;
/// Length of version field in the settlement payload
pub const SETTLEMENT_VERSION_LEN: usize = 1;
/// Length of each digest field in the settlement payload
pub const SETTLEMENT_DIGEST_LEN: usize = 32;
/// Length of each counter field in the settlement payload
pub const SETTLEMENT_COUNTER_LEN: usize = 8;

/// Total length of the settlement payload (117 bytes)
pub const SETTLEMENT_TOTAL_LEN: usize = SETTLEMENT_MAGIC_LEN
    + SETTLEMENT_VERSION_LEN
    + 3 * SETTLEMENT_DIGEST_LEN
    + 2 * SETTLEMENT_COUNTER_LEN;

// Offset constants
/// Offset of magic bytes in the settlement payload
pub const SETTLEMENT_OFFSET_MAGIC: usize = 0;
/// Offset of version field in the settlement payload
pub const SETTLEMENT_OFFSET_VERSION: usize = SETTLEMENT_OFFSET_MAGIC + SETTLEMENT_MAGIC_LEN;
/// Offset of the pre-state digest in the settlement payload
pub const SETTLEMENT_OFFSET_PRE: usize = SETTLEMENT_OFFSET_VERSION + SETTLEMENT_VERSION_LEN;
/// Offset of the post-state digest in the settlement payload
pub const SETTLEMENT_OFFSET_POST: usize = SETTLEMENT_OFFSET_PRE + SETTLEMENT_DIGEST_LEN;
/// Offset of the registry root in the settlement payload
pub const SETTLEMENT_OFFSET_REGISTRY: usize = SETTLEMENT_OFFSET_POST + SETTLEMENT_DIGEST_LEN;
/// Offset of the certificate length in the settlement payload
pub const SETTLEMENT_OFFSET_LENGTH: usize = SETTLEMENT_OFFSET_REGISTRY + SETTLEMENT_DIGEST_LEN;
/// Offset of the sequence number in the settlement payload
pub const SETTLEMENT_OFFSET_SEQUENCE: usize = SETTLEMENT_OFFSET_LENGTH + SETTLEMENT_COUNTER_LEN;

/// Maps a sequential index (block number, counter) to a map key
///
/// The key is `INDEX_KEY_PREFIX` followed by zero padding and the index in
/// big-endian order, so index order is preserved and no index collides with
/// `MIN_KEY` or `MAX_KEY`.
///
/// # Example
///
/// ```rust
/// use shielded_rollup::types::{index_key, MAX_KEY, MIN_KEY};
///
/// assert!(index_key(0) > MIN_KEY);
/// assert!(index_key(u64::MAX) < MAX_KEY);
/// assert!(index_key(1) < index_key(2));
/// ```
pub fn index_key(index: u64) -> MapKey {
    let mut key = [0u8; 32];
    key[0] = INDEX_KEY_PREFIX;
    key[24..].copy_from_slice(&index.to_be_bytes());
    key
}
