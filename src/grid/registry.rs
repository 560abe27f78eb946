//! The grid registry: owner of all live characteristic vectors.

use super::charvec::CharacteristicVector;
use super::key::GridKey;
use crate::density::DensityModel;
use std::collections::HashMap;

/// Mapping from grid key to characteristic vector.
///
/// The registry is the engine's primary mutable state. It is mutated only
/// by the driver (insert/update on ingest) and by the clustering and
/// sporadic passes; components that restructure it during a pass work from
/// key snapshots and re-read entries as they go.
#[derive(Debug, Default)]
pub struct GridRegistry {
    grids: HashMap<GridKey, CharacteristicVector>,
}

impl GridRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live grids.
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    /// True iff no grid is live.
    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// True iff the grid is live.
    pub fn contains(&self, key: &GridKey) -> bool {
        self.grids.contains_key(key)
    }

    /// The characteristic vector of a grid, if live.
    pub fn get(&self, key: &GridKey) -> Option<&CharacteristicVector> {
        self.grids.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &GridKey) -> Option<&mut CharacteristicVector> {
        self.grids.get_mut(key)
    }

    pub(crate) fn get_or_insert_with(
        &mut self,
        key: GridKey,
        make: impl FnOnce() -> CharacteristicVector,
    ) -> &mut CharacteristicVector {
        self.grids.entry(key).or_insert_with(make)
    }

    pub(crate) fn remove(&mut self, key: &GridKey) -> Option<CharacteristicVector> {
        self.grids.remove(key)
    }

    /// Iterate over all live grids.
    pub fn iter(&self) -> impl Iterator<Item = (&GridKey, &CharacteristicVector)> {
        self.grids.iter()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut CharacteristicVector> {
        self.grids.values_mut()
    }

    /// A cloned snapshot of all keys, for passes that restructure the
    /// registry while walking it.
    pub(crate) fn keys_snapshot(&self) -> Vec<GridKey> {
        self.grids.keys().cloned().collect()
    }

    /// Bulk density refresh: age every grid's density to tick `tc`.
    pub(crate) fn refresh_all(&mut self, tc: u64, model: &DensityModel) {
        for cv in self.grids.values_mut() {
            cv.refresh(tc, model);
        }
    }
}
