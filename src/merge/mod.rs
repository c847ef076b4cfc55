//! Certificate composition
//!
//! Certificates chain by digest adjacency: a run proved in parallel is
//! merged pairwise into one certificate whose size does not depend on the
//! number of steps it covers.

mod block;
mod engine;

pub use block::{Block, BlockBuilder};
pub use engine::{genesis_certificate, merge, merge_all};
