//! Full sub-maps backing a state record

use super::record::RollupState;
use super::submap::SubMap;
use crate::config::RollupContext;
use crate::errors::{Result, StateError};
use crate::hash::MapHasher;
use crate::imm::{IndexedMerkleMap, MapView};

/// One full indexed merkle map per [`SubMap`]
#[derive(Clone, Debug)]
pub struct SubMaps<H: MapHasher> {
    /// Note ledger
    pub ledger: IndexedMerkleMap<H>,
    /// Verification key registry
    pub registry: IndexedMerkleMap<H>,
    /// Block history
    pub history: IndexedMerkleMap<H>,
    /// Vaults
    pub vaults: IndexedMerkleMap<H>,
    /// Governance
    pub governance: IndexedMerkleMap<H>,
    /// Bridge
    pub bridge: IndexedMerkleMap<H>,
}

impl<H: MapHasher> SubMaps<H> {
    /// Empty maps with the configured heights
    pub fn genesis(ctx: &RollupContext<H>) -> Result<Self> {
        let config = ctx.config();
        let map = |height| IndexedMerkleMap::new(height, ctx.hasher().clone());
        Ok(Self {
            ledger: map(config.ledger_height)?,
            registry: map(config.registry_height)?,
            history: map(config.history_height)?,
            vaults: map(config.domain_height)?,
            governance: map(config.domain_height)?,
            bridge: map(config.domain_height)?,
        })
    }

    /// The map behind a tag
    pub fn get(&self, sub_map: SubMap) -> &IndexedMerkleMap<H> {
        match sub_map {
            SubMap::Ledger => &self.ledger,
            SubMap::Registry => &self.registry,
            SubMap::History => &self.history,
            SubMap::Vaults => &self.vaults,
            SubMap::Governance => &self.governance,
            SubMap::Bridge => &self.bridge,
        }
    }

    /// Mutable access to the map behind a tag
    pub fn get_mut(&mut self, sub_map: SubMap) -> &mut IndexedMerkleMap<H> {
        match sub_map {
            SubMap::Ledger => &mut self.ledger,
            SubMap::Registry => &mut self.registry,
            SubMap::History => &mut self.history,
            SubMap::Vaults => &mut self.vaults,
            SubMap::Governance => &mut self.governance,
            SubMap::Bridge => &mut self.bridge,
        }
    }

    /// Checks every map root against the state record
    pub fn verify_against(&self, state: &RollupState) -> Result<()> {
        for sub_map in SubMap::ALL {
            if self.get(sub_map).root() != state.root(sub_map) {
                return Err(StateError::SubMapRootMismatch(sub_map).into());
            }
        }
        Ok(())
    }

    /// Copies every map root into the state record
    pub fn write_roots(&self, state: &mut RollupState) {
        for sub_map in SubMap::ALL {
            state.set_root(sub_map, self.get(sub_map).root());
        }
    }
}

impl RollupState {
    /// State with the roots of `maps` and zero scalars
    pub fn from_maps<H: MapHasher>(maps: &SubMaps<H>) -> Self {
        let mut state = Self::default();
        maps.write_roots(&mut state);
        state
    }
}
