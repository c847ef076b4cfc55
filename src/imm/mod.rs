//! Indexed merkle maps
//!
//! An indexed merkle map is a fixed-height merkle tree whose leaves form a
//! linked list sorted by key. Membership is proved with the key's leaf;
//! non-membership with the "low" leaf whose `(key, next_key)` gap contains
//! the target. Pruned maps keep only what a fixed set of such proofs needs.

mod leaf;
mod map;
mod proof;
mod pruned;
mod serialized;
mod store;
mod tree;
mod view;

pub use leaf::Leaf;
pub(crate) use leaf::check_key;
pub use map::IndexedMerkleMap;
pub use proof::{verify_membership, verify_non_membership, MembershipProof, NonMembershipProof};
pub use pruned::{PruneRequest, PruneStats, PrunedMap, SerializedPrunedMap};
pub use serialized::SerializedMap;
pub use store::{CachedStore, InMemoryStore, MapStore};
pub use tree::compute_root_from_path;
pub use view::MapView;
