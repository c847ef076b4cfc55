//! Intents and intent proofs
//!
//! An intent is one user-authorized action together with the live state
//! values it was built against. The proof system producing intent proofs is
//! external; here a program is a Schnorr keypair, its verification key is
//! the x-only public key and a proof is a signature over the encoded intent.
//! The verifier treats a proof that checks as an opaque verified fact.

use bitcoin::secp256k1::schnorr::Signature;
use bitcoin::secp256k1::{Keypair, Message, SecretKey, XOnlyPublicKey};
use serde::{Deserialize, Serialize};

use super::precondition::Precondition;
use crate::config::RollupContext;
use crate::errors::{Result, TransitionError};
use crate::hash::MapHasher;
use crate::state::{RollupState, Scalar, SubMap};
use crate::types::{Bytes32, Digest, MapKey, MapValue, INTENT_DOMAIN};

/// Operation types a registered program may authorize
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Create notes backed by new supply
    Mint,
    /// Move value between notes
    Transfer,
    /// Destroy notes and reduce supply
    Burn,
    /// Record the current digest in the history and open the next block
    CloseBlock,
    /// Add or change a registry entry
    RegisterProgram,
    /// Write into a domain sub-map
    DomainUpdate,
    /// Settle without the operator signature
    EmergencySettle,
}

impl OperationKind {
    /// Stable one-byte code
    pub fn code(self) -> u8 {
        match self {
            OperationKind::Mint => 1,
            OperationKind::Transfer => 2,
            OperationKind::Burn => 3,
            OperationKind::CloseBlock => 4,
            OperationKind::RegisterProgram => 5,
            OperationKind::DomainUpdate => 6,
            OperationKind::EmergencySettle => 7,
        }
    }

    /// Inverse of [`OperationKind::code`]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(OperationKind::Mint),
            2 => Some(OperationKind::Transfer),
            3 => Some(OperationKind::Burn),
            4 => Some(OperationKind::CloseBlock),
            5 => Some(OperationKind::RegisterProgram),
            6 => Some(OperationKind::DomainUpdate),
            7 => Some(OperationKind::EmergencySettle),
            _ => None,
        }
    }

    /// Registry value recording this kind
    pub fn to_value(self) -> MapValue {
        let mut value = [0u8; 32];
        value[31] = self.code();
        value
    }

    /// Kind recorded by a registry value
    pub fn from_value(value: &MapValue) -> Option<Self> {
        match value[..31].iter().all(|byte| *byte == 0) {
            true => Self::from_code(value[31]),
            false => None,
        }
    }

    /// Scalar an intent of this kind must pin with a precondition
    ///
    /// Note operations spend nullifiers and insert fresh commitments, so
    /// their proofs cannot apply twice. Every other state transition has
    /// no such one-shot effect and is pinned to a counter that it, or any
    /// later step, moves forward.
    pub fn anchor(self) -> Option<Scalar> {
        match self {
            OperationKind::Mint | OperationKind::Transfer | OperationKind::Burn => None,
            OperationKind::CloseBlock => Some(Scalar::BlockNumber),
            OperationKind::RegisterProgram | OperationKind::DomainUpdate => Some(Scalar::Sequence),
            OperationKind::EmergencySettle => None,
        }
    }
}

/// Public key identifying an intent program
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VerificationKey(XOnlyPublicKey);

impl VerificationKey {
    /// Wraps an x-only public key
    pub fn new(key: XOnlyPublicKey) -> Self { Self(key) }

    /// Serialized key
    pub fn to_bytes(&self) -> Bytes32 { self.0.serialize() }

    /// The underlying public key
    pub fn public_key(&self) -> &XOnlyPublicKey { &self.0 }
}

/// The action an intent authorizes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntentAction {
    /// Mint `amount` into the outputs of the bound note transaction
    Mint {
        /// Minted value
        amount: u64,
        /// Binding hash of the note transaction
        binding: Bytes32,
    },
    /// Spend and recreate notes with equal value
    Transfer {
        /// Binding hash of the note transaction
        binding: Bytes32,
    },
    /// Spend notes, recreating all but `amount`
    Burn {
        /// Burned value
        amount: u64,
        /// Binding hash of the note transaction
        binding: Bytes32,
    },
    /// Close the current block
    CloseBlock,
    /// Permit `vk` to authorize `kind`
    RegisterProgram {
        /// Program to register
        vk: VerificationKey,
        /// Operation it may authorize
        kind: OperationKind,
    },
    /// Insert or update entries of an unprotected sub-map
    DomainUpdate {
        /// Target sub-map
        sub_map: SubMap,
        /// Key-value writes in order
        writes: Vec<(MapKey, MapValue)>,
    },
    /// Authorize settlement of a certificate ending at `post_digest`
    EmergencySettle {
        /// Sequence number of the post state
        sequence: u64,
        /// Post-state digest to settle
        post_digest: Digest,
    },
}

impl IntentAction {
    /// Kind of this action
    pub fn kind(&self) -> OperationKind {
        match self {
            IntentAction::Mint { .. } => OperationKind::Mint,
            IntentAction::Transfer { .. } => OperationKind::Transfer,
            IntentAction::Burn { .. } => OperationKind::Burn,
            IntentAction::CloseBlock => OperationKind::CloseBlock,
            IntentAction::RegisterProgram { .. } => OperationKind::RegisterProgram,
            IntentAction::DomainUpdate { .. } => OperationKind::DomainUpdate,
            IntentAction::EmergencySettle { .. } => OperationKind::EmergencySettle,
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.kind().code());
        match self {
            IntentAction::Mint { amount, binding } | IntentAction::Burn { amount, binding } => {
                out.extend_from_slice(&amount.to_le_bytes());
                out.extend_from_slice(binding);
            }
            IntentAction::Transfer { binding } => out.extend_from_slice(binding),
            IntentAction::CloseBlock => {}
            IntentAction::RegisterProgram { vk, kind } => {
                out.extend_from_slice(&vk.to_bytes());
                out.push(kind.code());
            }
            IntentAction::DomainUpdate { sub_map, writes } => {
                out.push(sub_map.code());
                out.extend_from_slice(&(writes.len() as u32).to_le_bytes());
                for (key, value) in writes {
                    out.extend_from_slice(key);
                    out.extend_from_slice(value);
                }
            }
            IntentAction::EmergencySettle { sequence, post_digest } => {
                out.extend_from_slice(&sequence.to_le_bytes());
                out.extend_from_slice(post_digest);
            }
        }
    }
}

/// Public output of an intent proof
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Intent {
    /// What the intent authorizes
    pub action: IntentAction,
    /// Live state values the intent was built against
    pub preconditions: Vec<Precondition>,
}

impl Intent {
    /// Intent without preconditions
    pub fn new(action: IntentAction) -> Self { Self { action, preconditions: Vec::new() } }

    /// Intent pinned to the live value of its kind's anchor in `state`
    pub fn anchored(action: IntentAction, state: &RollupState) -> Self {
        let intent = Self::new(action);
        match intent.kind().anchor() {
            Some(scalar) => intent
                .with_precondition(Precondition::Scalar { scalar, value: state.scalar(scalar) }),
            None => intent,
        }
    }

    /// Adds a precondition
    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// Kind of the action
    pub fn kind(&self) -> OperationKind { self.action.kind() }

    /// Checks that the intent declares its kind's anchor
    ///
    /// Only the presence is checked here; the value is matched against the
    /// live state with the other preconditions.
    ///
    /// # Errors
    /// `MissingAnchor` if the kind needs an anchor the intent does not declare
    pub fn check_anchor(&self) -> Result<()> {
        let Some(anchor) = self.kind().anchor() else {
            return Ok(());
        };
        let declared = self.preconditions.iter().any(|precondition| {
            matches!(precondition, Precondition::Scalar { scalar, .. } if *scalar == anchor)
        });
        if !declared {
            return Err(TransitionError::MissingAnchor { kind: self.kind(), scalar: anchor }.into());
        }
        Ok(())
    }

    /// Canonical byte encoding
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.action.encode_into(&mut out);
        out.extend_from_slice(&(self.preconditions.len() as u32).to_le_bytes());
        for precondition in &self.preconditions {
            precondition.encode_into(&mut out);
        }
        out
    }
}

/// Message an intent proof signs
fn intent_message<H: MapHasher>(hasher: &H, vk: &VerificationKey, intent: &Intent) -> Message {
    Message::from_digest(hasher.hash_fields(INTENT_DOMAIN, &[&vk.to_bytes(), &intent.encode()]))
}

/// Key material of an intent program
#[derive(Clone, Debug)]
pub struct IntentProgram {
    keypair: Keypair,
}

impl IntentProgram {
    /// Creates a program from 32 secret bytes
    pub fn from_secret<H: MapHasher>(ctx: &RollupContext<H>, secret: &Bytes32) -> Result<Self> {
        let secret = SecretKey::from_slice(secret).map_err(|_| TransitionError::InvalidProgramKey)?;
        Ok(Self { keypair: Keypair::from_secret_key(ctx.secp(), &secret) })
    }

    /// Verification key of the program
    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey(XOnlyPublicKey::from_keypair(&self.keypair).0)
    }

    /// Produces a proof for `intent`
    pub fn prove<H: MapHasher>(&self, ctx: &RollupContext<H>, intent: Intent) -> IntentProof {
        let vk = self.verification_key();
        let message = intent_message(ctx.hasher(), &vk, &intent);
        let signature = ctx.secp().sign_schnorr_no_aux_rand(&message, &self.keypair);
        IntentProof { vk, intent, signature }
    }
}

/// A proof that a program authorized an intent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentProof {
    /// Program that produced the proof
    pub vk: VerificationKey,
    /// Public output
    pub intent: Intent,
    /// Proof bytes
    pub signature: Signature,
}

impl IntentProof {
    /// Checks the proof against its verification key
    pub fn verify<H: MapHasher>(&self, ctx: &RollupContext<H>) -> Result<&Intent> {
        let message = intent_message(ctx.hasher(), &self.vk, &self.intent);
        ctx.secp()
            .verify_schnorr(&self.signature, &message, self.vk.public_key())
            .map_err(|_| TransitionError::InvalidIntentProof)?;
        Ok(&self.intent)
    }
}
