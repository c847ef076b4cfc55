//! Tags for the fields of the rollup state record

use serde::{Deserialize, Serialize};

/// Domain sub-maps whose roots the state record carries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubMap {
    /// Commitments and nullifiers
    Ledger,
    /// Verification keys of permitted intent programs
    Registry,
    /// State digests indexed by block number
    History,
    /// Collateral vaults
    Vaults,
    /// Governance records
    Governance,
    /// Bridge accounting
    Bridge,
}

impl SubMap {
    /// Every sub-map in canonical encoding order
    pub const ALL: [SubMap; 6] = [
        SubMap::Ledger,
        SubMap::Registry,
        SubMap::History,
        SubMap::Vaults,
        SubMap::Governance,
        SubMap::Bridge,
    ];

    /// Stable one-byte tag used in intent encodings
    pub fn code(self) -> u8 {
        match self {
            SubMap::Ledger => 0,
            SubMap::Registry => 1,
            SubMap::History => 2,
            SubMap::Vaults => 3,
            SubMap::Governance => 4,
            SubMap::Bridge => 5,
        }
    }

    /// Returns true for sub-maps only written by their own protocol
    pub fn is_protected(self) -> bool {
        match self {
            SubMap::Ledger | SubMap::Registry | SubMap::History => true,
            SubMap::Vaults | SubMap::Governance | SubMap::Bridge => false,
        }
    }
}

/// Scalar parameters of the state record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scalar {
    /// Oracle price of the collateral asset
    OraclePrice,
    /// Minimum collateral ratio
    CollateralRatio,
    /// Stablecoin supply in circulation
    TotalSupply,
    /// Number of closed blocks
    BlockNumber,
    /// Number of applied transitions
    Sequence,
}

impl Scalar {
    /// Every scalar in canonical encoding order
    pub const ALL: [Scalar; 5] = [
        Scalar::OraclePrice,
        Scalar::CollateralRatio,
        Scalar::TotalSupply,
        Scalar::BlockNumber,
        Scalar::Sequence,
    ];

    /// Stable one-byte tag used in intent encodings
    pub fn code(self) -> u8 {
        match self {
            Scalar::OraclePrice => 0,
            Scalar::CollateralRatio => 1,
            Scalar::TotalSupply => 2,
            Scalar::BlockNumber => 3,
            Scalar::Sequence => 4,
        }
    }
}
