//! Grid clusters: labelled groups of grids with inside/outside tracking.
//!
//! A member is *inside* its cluster iff all of its 2d lattice neighbours
//! are also members; otherwise it is *outside*. A valid grid cluster has
//! only DENSE inside members and DENSE or TRANSITIONAL outside members —
//! the clustering engine maintains that; this type only tracks membership
//! and the inside flags.

use crate::grid::GridKey;
use std::collections::HashMap;

/// One cluster: a label plus its member grids, each tagged with an
/// inside/outside flag.
#[derive(Clone, Debug, Default)]
pub struct GridCluster {
    label: usize,
    grids: HashMap<GridKey, bool>,
}

impl GridCluster {
    /// Create an empty cluster with the given label.
    pub fn new(label: usize) -> Self {
        Self {
            label,
            grids: HashMap::new(),
        }
    }

    /// The cluster's label (its index in the cluster registry).
    pub fn label(&self) -> usize {
        self.label
    }

    pub(crate) fn set_label(&mut self, label: usize) {
        self.label = label;
    }

    /// Cluster weight: the number of member grids.
    pub fn weight(&self) -> usize {
        self.grids.len()
    }

    /// True iff the cluster has no members.
    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// True iff the grid is a member.
    pub fn contains(&self, key: &GridKey) -> bool {
        self.grids.contains_key(key)
    }

    /// Iterate over members as `(key, inside)` pairs.
    pub fn grids(&self) -> impl Iterator<Item = (&GridKey, bool)> {
        self.grids.iter().map(|(key, &inside)| (key, inside))
    }

    /// Iterate over member keys.
    pub fn keys(&self) -> impl Iterator<Item = &GridKey> {
        self.grids.keys()
    }

    /// A cloned snapshot of the outside members.
    pub fn outside_members(&self) -> Vec<GridKey> {
        self.grids
            .iter()
            .filter(|(_, &inside)| !inside)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// True iff every lattice neighbour of `key` is a member.
    pub fn is_inside(&self, key: &GridKey) -> bool {
        key.neighbours().all(|n| self.grids.contains_key(&n))
    }

    /// True iff every lattice neighbour of `key` is a member or is `extra`.
    ///
    /// Evaluates `key`'s insideness as if `extra` had already been added,
    /// which is what the adjustment pass needs before committing an add.
    pub fn is_inside_with(&self, key: &GridKey, extra: &GridKey) -> bool {
        key.neighbours().all(|n| n == *extra || self.grids.contains_key(&n))
    }

    /// Add a grid, then refresh the inside flags of its in-cluster
    /// neighbours (their neighbour count just changed).
    pub(crate) fn add_grid(&mut self, key: GridKey) {
        let inside = self.is_inside(&key);
        self.grids.insert(key.clone(), inside);
        self.refresh_around(&key);
    }

    /// Remove a grid, refreshing the inside flags of its in-cluster
    /// neighbours. Returns whether the grid was a member.
    pub(crate) fn remove_grid(&mut self, key: &GridKey) -> bool {
        if self.grids.remove(key).is_none() {
            return false;
        }
        self.refresh_around(key);
        true
    }

    /// Admit another cluster's members, initially all outside, then
    /// recompute every inside flag.
    pub(crate) fn absorb(&mut self, members: HashMap<GridKey, bool>) {
        for key in members.into_keys() {
            self.grids.insert(key, false);
        }
        self.recompute_inside();
    }

    /// Drain this cluster's member map (used by merge).
    pub(crate) fn take_grids(&mut self) -> HashMap<GridKey, bool> {
        std::mem::take(&mut self.grids)
    }

    fn refresh_around(&mut self, key: &GridKey) {
        for neighbour in key.neighbours() {
            if self.grids.contains_key(&neighbour) {
                let inside = self.is_inside(&neighbour);
                self.grids.insert(neighbour, inside);
            }
        }
    }

    fn recompute_inside(&mut self) {
        let keys: Vec<GridKey> = self.grids.keys().cloned().collect();
        for key in keys {
            let inside = self.is_inside(&key);
            self.grids.insert(key, inside);
        }
    }
}
