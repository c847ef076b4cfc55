//! Rollup state record
//!
//! The record bundles the root of every domain sub-map with the scalar
//! parameters of the rollup. Its digest is the only thing transition
//! certificates commit to; the maps themselves travel as witnesses and are
//! checked against the record before use.

mod maps;
mod record;
mod submap;

pub use maps::SubMaps;
pub use record::RollupState;
pub use submap::{Scalar, SubMap};
