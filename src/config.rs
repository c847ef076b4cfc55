//! Rollup configuration and proving context
//!
//! [`RollupConfig`] carries the tunable parameters (sub-map heights and the
//! snapshot cooldown). [`RollupContext`] is built once from a validated
//! configuration and owns everything proof construction shares: the map
//! hasher, the secp256k1 context and the dummy-note key material. It is
//! passed by reference through every ledger, transition and settlement call
//! and cloned per worker when proofs are built in parallel.

use bitcoin::secp256k1::{All, Secp256k1};
use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, Result};
use crate::hash::{MapHasher, Poseidon2Hasher};
use crate::ledger::{Address, SpendingKey};
use crate::types::{DUMMY_KEY_SEED, MAX_TREE_HEIGHT};

/// Tunable rollup parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollupConfig {
    /// Height of the note ledger map
    pub ledger_height: u8,
    /// Height of the verification key registry
    pub registry_height: u8,
    /// Height of the block history map
    pub history_height: u8,
    /// Height of each domain sub-map (vaults, governance, bridge)
    pub domain_height: u8,
    /// Minimum age in blocks of a snapshot cited by an intent
    pub snapshot_cooldown: u64,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            ledger_height: 32,
            registry_height: 8,
            history_height: 20,
            domain_height: 20,
            snapshot_cooldown: 1,
        }
    }
}

impl RollupConfig {
    /// Parses a configuration from JSON, filling missing fields with defaults
    ///
    /// # Example
    ///
    /// ```rust
    /// use shielded_rollup::RollupConfig;
    ///
    /// let config = RollupConfig::from_json(r#"{ "ledger_height": 16 }"#)?;
    ///
    /// assert_eq!(config.ledger_height, 16);
    /// assert_eq!(config.registry_height, RollupConfig::default().registry_height);
    /// # Ok::<(), shielded_rollup::Error>(())
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every height is in `1..=MAX_TREE_HEIGHT` and the cooldown is non-zero
    pub fn validate(&self) -> Result<()> {
        let heights = [
            ("ledger_height", self.ledger_height),
            ("registry_height", self.registry_height),
            ("history_height", self.history_height),
            ("domain_height", self.domain_height),
        ];
        for (name, height) in heights {
            if height == 0 || height > MAX_TREE_HEIGHT {
                return Err(
                    ConfigError::InvalidHeight { name, height, max: MAX_TREE_HEIGHT }.into()
                );
            }
        }
        if self.snapshot_cooldown == 0 {
            return Err(ConfigError::ZeroCooldown.into());
        }
        Ok(())
    }
}

/// Shared context for proof construction and verification
#[derive(Clone, Debug)]
pub struct RollupContext<H: MapHasher = Poseidon2Hasher> {
    config: RollupConfig,
    hasher: H,
    secp: Secp256k1<All>,
    dummy_key: SpendingKey,
    dummy_address: Address,
}

impl RollupContext<Poseidon2Hasher> {
    /// Builds a context with the default Poseidon2 hasher
    pub fn new(config: RollupConfig) -> Result<Self> {
        Self::with_hasher(config, Poseidon2Hasher::new())
    }
}

impl<H: MapHasher> RollupContext<H> {
    /// Builds a context with a caller-supplied hasher
    ///
    /// # Arguments
    /// * `config` - Rollup parameters, validated here
    /// * `hasher` - Hash function shared by every map and protocol hash
    pub fn with_hasher(config: RollupConfig, hasher: H) -> Result<Self> {
        config.validate()?;
        let secp = Secp256k1::new();
        let dummy_key = SpendingKey::from_bytes(&DUMMY_KEY_SEED)?;
        let dummy_address = dummy_key.address(&secp, &hasher);
        Ok(Self { config, hasher, secp, dummy_key, dummy_address })
    }

    /// Rollup parameters
    pub fn config(&self) -> &RollupConfig { &self.config }

    /// Hasher shared by all maps
    pub fn hasher(&self) -> &H { &self.hasher }

    /// secp256k1 signing and verification context
    pub fn secp(&self) -> &Secp256k1<All> { &self.secp }

    /// Spending key padding dummy note slots
    pub fn dummy_key(&self) -> &SpendingKey { &self.dummy_key }

    /// Recipient of every dummy note
    pub fn dummy_address(&self) -> &Address { &self.dummy_address }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::hash::Sha256Hasher;

    #[test]
    fn test_default_config_is_valid() {
        let config = RollupConfig::default();

        let result = config.validate();

        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_zero_height() {
        let config = RollupConfig { history_height: 0, ..RollupConfig::default() };

        let result = config.validate();

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidHeight { name: "history_height", .. }))
        ));
    }

    #[test]
    fn test_rejects_oversized_height() {
        let config = RollupConfig { ledger_height: MAX_TREE_HEIGHT + 1, ..RollupConfig::default() };

        let result = config.validate();

        assert!(matches!(result, Err(Error::Config(ConfigError::InvalidHeight { .. }))));
    }

    #[test]
    fn test_rejects_zero_cooldown() {
        let config = RollupConfig { snapshot_cooldown: 0, ..RollupConfig::default() };

        let result = config.validate();

        assert_eq!(result, Err(Error::Config(ConfigError::ZeroCooldown)));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result = RollupConfig::from_json("not json");

        assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
    }

    #[test]
    fn test_context_dummy_address_is_stable() {
        let first = RollupContext::with_hasher(RollupConfig::default(), Sha256Hasher)
            .expect("should build context");
        let second = RollupContext::with_hasher(RollupConfig::default(), Sha256Hasher)
            .expect("should build context");

        assert_eq!(first.dummy_address(), second.dummy_address());
    }
}
