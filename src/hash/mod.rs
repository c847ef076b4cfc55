//! Domain-separated hashing
//!
//! Every digest in the rollup (tree nodes, note commitments, nullifiers,
//! state digests, intent messages) goes through a [`MapHasher`]. The
//! default [`Poseidon2Hasher`] is circuit-friendly; [`Sha256Hasher`] is a
//! drop-in for hosts that only need native verification.

mod hasher;
mod poseidon2;

pub use hasher::{MapHasher, Sha256Hasher};
pub use poseidon2::Poseidon2Hasher;
