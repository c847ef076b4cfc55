//! State transitions
//!
//! One transition consumes an intent proof, checks it against the current
//! state record and applies the operation it authorizes. Accepted steps
//! produce certificates that the merge engine chains by digest adjacency.

mod certificate;
mod history;
mod intent;
mod operation;
mod precondition;
mod registry;
mod verifier;

pub use certificate::TransitionCertificate;
pub use history::{check_snapshot, record_snapshot};
pub use intent::{Intent, IntentAction, IntentProgram, IntentProof, OperationKind, VerificationKey};
pub use operation::OperationWitness;
pub use precondition::Precondition;
pub use registry::{check_registered, register_program, registry_key};
pub use verifier::{verify_transition, TransitionOutput};
