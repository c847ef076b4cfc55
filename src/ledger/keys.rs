//! Note key hierarchy
//!
//! A spending key is a secp256k1 secret. The nullifier key is derived from
//! it and the viewing key from the nullifier key, so presenting a nullifier
//! key proves which recipient it belongs to without revealing the secret.

use bitcoin::secp256k1::{Keypair, Secp256k1, SecretKey, Signing, XOnlyPublicKey};

use crate::errors::{LedgerError, Result};
use crate::hash::MapHasher;
use crate::types::{Bytes32, NULLIFIER_KEY_DOMAIN, VIEWING_KEY_DOMAIN};

/// Secret authorizing spends
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpendingKey {
    secret: SecretKey,
}

/// Key used to derive nullifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NullifierKey(Bytes32);

/// Public recipient of a note
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    /// Hash of the recipient's nullifier key
    pub viewing_key: Bytes32,
    /// Key that must sign spends of the recipient's notes
    pub spending_key: XOnlyPublicKey,
}

impl SpendingKey {
    /// Creates a spending key from 32 secret bytes
    ///
    /// # Errors
    /// `InvalidSpendingKey` if the bytes are zero or not below the curve order
    pub fn from_bytes(bytes: &Bytes32) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| LedgerError::InvalidSpendingKey)?;
        Ok(Self { secret })
    }

    /// Signing keypair
    pub fn keypair<C: Signing>(&self, secp: &Secp256k1<C>) -> Keypair {
        Keypair::from_secret_key(secp, &self.secret)
    }

    /// X-only public key checked against spend signatures
    pub fn public_key<C: Signing>(&self, secp: &Secp256k1<C>) -> XOnlyPublicKey {
        XOnlyPublicKey::from_keypair(&self.keypair(secp)).0
    }

    /// Derives the nullifier key
    pub fn nullifier_key<H: MapHasher>(&self, hasher: &H) -> NullifierKey {
        NullifierKey(hasher.hash_fields(NULLIFIER_KEY_DOMAIN, &[&self.secret.secret_bytes()]))
    }

    /// Derives the public address
    pub fn address<C: Signing, H: MapHasher>(&self, secp: &Secp256k1<C>, hasher: &H) -> Address {
        Address {
            viewing_key: self.nullifier_key(hasher).viewing_key(hasher),
            spending_key: self.public_key(secp),
        }
    }
}

impl NullifierKey {
    /// Derives the viewing key bound to this nullifier key
    pub fn viewing_key<H: MapHasher>(&self, hasher: &H) -> Bytes32 {
        hasher.hash_fields(VIEWING_KEY_DOMAIN, &[&self.0])
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &Bytes32 { &self.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha256Hasher;

    #[test]
    fn test_rejects_zero_key() {
        let result = SpendingKey::from_bytes(&[0u8; 32]);

        assert!(result.is_err());
    }

    #[test]
    fn test_address_binds_nullifier_key() {
        let secp = Secp256k1::new();
        let key = SpendingKey::from_bytes(&[7u8; 32]).expect("should create key");
        let other = SpendingKey::from_bytes(&[8u8; 32]).expect("should create key");

        let address = key.address(&secp, &Sha256Hasher);

        let own = key.nullifier_key(&Sha256Hasher).viewing_key(&Sha256Hasher);
        let foreign = other.nullifier_key(&Sha256Hasher).viewing_key(&Sha256Hasher);
        assert_eq!(own, address.viewing_key);
        assert_ne!(foreign, address.viewing_key);
        assert_eq!(address.spending_key, key.public_key(&secp));
    }
}
