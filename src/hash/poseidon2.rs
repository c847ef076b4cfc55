//! Poseidon2 hasher over BabyBear
//!
//! The permutation is instantiated once from a fixed seed and shared by
//! every clone of the hasher, so parallel proof construction hashes with
//! identical constants.

use std::fmt;
use std::sync::Arc;

use p3_baby_bear::{BabyBear, Poseidon2BabyBear};
use p3_field::PrimeField32;
use p3_symmetric::{CryptographicHasher, PaddingFreeSponge};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::hash::MapHasher;
use crate::types::Bytes32;

/// Poseidon2 state width
const POSEIDON2_WIDTH: usize = 16;
/// Sponge rate in field elements
const POSEIDON2_RATE: usize = 8;
/// Output size in field elements (8 x 4 bytes = 32 bytes)
const POSEIDON2_OUTPUT_SIZE: usize = 8;
/// Seed of the round constants
const POSEIDON2_SEED: u64 = 1;
/// Bytes packed into one field element
const BYTES_PER_FIELD: usize = 3;

/// Poseidon2 permutation type for BabyBear (width: 16)
type Perm = Poseidon2BabyBear<POSEIDON2_WIDTH>;
/// Poseidon2 hash sponge (rate: 8, output: 8 field elements = 32 bytes)
type PoseidonHash = PaddingFreeSponge<Perm, POSEIDON2_WIDTH, POSEIDON2_RATE, POSEIDON2_OUTPUT_SIZE>;

/// Poseidon2 hasher implementation
///
/// Byte strings are absorbed as a length element followed by 3-byte
/// little-endian chunks, which keeps the encoding injective in a 31-bit field.
#[derive(Clone)]
pub struct Poseidon2Hasher {
    sponge: Arc<PoseidonHash>,
}

impl Poseidon2Hasher {
    /// Creates the hasher with the protocol's fixed round constants
    pub fn new() -> Self {
        let mut rng = SmallRng::seed_from_u64(POSEIDON2_SEED);
        let perm = Perm::new_from_rng_128(&mut rng);
        Self { sponge: Arc::new(PoseidonHash::new(perm)) }
    }
}

impl Default for Poseidon2Hasher {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Poseidon2Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poseidon2Hasher").finish_non_exhaustive()
    }
}

/// Appends the field encoding of one byte string
fn absorb_bytes(fields: &mut Vec<BabyBear>, bytes: &[u8]) {
    fields.push(BabyBear::new(bytes.len() as u32));
    for chunk in bytes.chunks(BYTES_PER_FIELD) {
        let mut arr = [0u8; 4];
        arr[..chunk.len()].copy_from_slice(chunk);
        fields.push(BabyBear::new(u32::from_le_bytes(arr)));
    }
}

/// Converts 8 field elements to Bytes32 (little-endian canonical form)
fn fields_to_bytes32(fields: [BabyBear; POSEIDON2_OUTPUT_SIZE]) -> Bytes32 {
    let mut bytes = [0u8; 32];
    for (i, field) in fields.iter().enumerate() {
        let val = field.as_canonical_u32();
        bytes[i * 4..(i + 1) * 4].copy_from_slice(&val.to_le_bytes());
    }
    bytes
}

impl MapHasher for Poseidon2Hasher {
    fn hash_fields(&self, domain_tag: &[u8], inputs: &[&[u8]]) -> Bytes32 {
        let total: usize = inputs.iter().map(|input| input.len() / BYTES_PER_FIELD + 2).sum();
        let mut fields = Vec::with_capacity(total + domain_tag.len() / BYTES_PER_FIELD + 2);
        absorb_bytes(&mut fields, domain_tag);
        for input in inputs {
            absorb_bytes(&mut fields, input);
        }
        fields_to_bytes32(self.sponge.hash_iter(fields))
    }
}
