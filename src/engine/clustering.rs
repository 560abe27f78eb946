//! Clustering passes: the one-time initial clustering, the label
//! propagation fixpoint, the incremental adjustment, and cluster merging.
//!
//! Both registries mutate while these passes walk them, so every pass
//! works from key snapshots and re-reads live state at each step; the
//! propagation loop applies at most one mutation per pass and restarts.

use super::DStream;
use crate::cluster::GridCluster;
use crate::density::GridAttribute;
use crate::grid::GridKey;

impl DStream {
    /// One-time bulk clustering at the first gap boundary.
    ///
    /// Refreshes all densities, seeds a singleton cluster per dense grid,
    /// labels everything else NO_CLASS, then runs the label-propagation
    /// fixpoint.
    pub(crate) fn initial_clustering(&mut self) {
        self.grids.refresh_all(self.tc, &self.model);

        for key in self.grids.keys_snapshot() {
            let Some(cv) = self.grids.get_mut(&key) else { continue };
            cv.clear_attribute_changed();
            if cv.attribute() == GridAttribute::Dense {
                let label = self.clusters.next_label();
                cv.set_label(Some(label));
                let mut cluster = GridCluster::new(label);
                cluster.add_grid(key);
                self.clusters.push(cluster);
            } else {
                cv.set_label(None);
            }
        }

        while self.propagate_labels() {}
    }

    /// One label-propagation pass.
    ///
    /// For each cluster, each outside member, each registry-present
    /// neighbour: a neighbour in a different cluster triggers a merge of
    /// the lighter into the heavier; an unlabelled transitional neighbour
    /// is absorbed. Returns on the first mutation — the registries changed
    /// under the walk, so the caller restarts until a full pass is clean.
    pub(crate) fn propagate_labels(&mut self) -> bool {
        for own in 0..self.clusters.len() {
            let outside = match self.clusters.get(own) {
                Some(cluster) => cluster.outside_members(),
                None => continue,
            };
            for member in outside {
                for neighbour in member.neighbours() {
                    let (neighbour_label, neighbour_attribute) =
                        match self.grids.get(&neighbour) {
                            Some(cv) => (cv.label(), cv.attribute()),
                            None => continue,
                        };
                    match neighbour_label {
                        Some(other) if other != own => {
                            if self.cluster_weight(own) < self.cluster_weight(other) {
                                self.merge_clusters(own, other);
                            } else {
                                self.merge_clusters(other, own);
                            }
                            return true;
                        }
                        None if neighbour_attribute == GridAttribute::Transitional => {
                            self.assign_to_cluster(neighbour, own);
                            return true;
                        }
                        _ => {}
                    }
                }
            }
        }
        false
    }

    /// Incremental adjustment, run every gap boundary after the first,
    /// immediately after sporadic removal.
    ///
    /// Refreshes all densities, then reacts to every grid whose density
    /// class changed since the last cycle.
    pub(crate) fn adjust_clustering(&mut self) {
        self.grids.refresh_all(self.tc, &self.model);

        let changed: Vec<GridKey> = self
            .grids
            .iter()
            .filter(|(_, cv)| cv.attribute_changed())
            .map(|(key, _)| key.clone())
            .collect();

        for key in changed {
            let (attribute, label) = match self.grids.get_mut(&key) {
                Some(cv) => {
                    cv.clear_attribute_changed();
                    (cv.attribute(), cv.label())
                }
                None => continue,
            };
            match attribute {
                GridAttribute::Sparse => self.detach_grid(&key, label),
                GridAttribute::Dense => self.adjust_dense(&key, label),
                GridAttribute::Transitional => self.adjust_transitional(&key, label),
            }
        }
    }

    /// A grid turned sparse: take it out of its cluster, if any.
    fn detach_grid(&mut self, key: &GridKey, label: Option<usize>) {
        let Some(own) = label else { return };
        if let Some(cv) = self.grids.get_mut(key) {
            cv.set_label(None);
        }
        let emptied = match self.clusters.get_mut(own) {
            Some(cluster) => {
                cluster.remove_grid(key);
                cluster.is_empty()
            }
            None => panic!("label {own} points at no live cluster"),
        };
        if emptied {
            self.remove_cluster(own);
        }
    }

    /// A grid turned dense: attach it to (or merge it with) the heaviest
    /// neighbouring cluster.
    fn adjust_dense(&mut self, key: &GridKey, label: Option<usize>) {
        let Some((h_key, h_cluster)) = self.heaviest_neighbour(key, label, false) else {
            return;
        };
        let h_attribute = match self.grids.get(&h_key) {
            Some(cv) => cv.attribute(),
            None => return,
        };

        match h_attribute {
            GridAttribute::Dense => match label {
                None => self.assign_to_cluster(key.clone(), h_cluster),
                Some(own) => {
                    if self.cluster_weight(own) <= self.cluster_weight(h_cluster) {
                        self.merge_clusters(own, h_cluster);
                    } else {
                        self.merge_clusters(h_cluster, own);
                    }
                }
            },
            GridAttribute::Transitional => {
                // h must stay an outside grid of its cluster even with
                // this grid added; otherwise Definition 3.6 would break.
                let h_stays_outside = match self.clusters.get(h_cluster) {
                    Some(cluster) => !cluster.is_inside_with(&h_key, key),
                    None => panic!("label {h_cluster} points at no live cluster"),
                };
                if label.is_none() && h_stays_outside {
                    self.assign_to_cluster(key.clone(), h_cluster);
                } else if let Some(own) = label {
                    if self.cluster_weight(own) >= self.cluster_weight(h_cluster) {
                        // Move h into this grid's cluster.
                        self.assign_to_cluster(h_key.clone(), own);
                        let emptied = match self.clusters.get_mut(h_cluster) {
                            Some(cluster) => {
                                cluster.remove_grid(&h_key);
                                cluster.is_empty()
                            }
                            None => panic!("label {h_cluster} points at no live cluster"),
                        };
                        if emptied {
                            self.remove_cluster(h_cluster);
                        }
                    }
                }
            }
            GridAttribute::Sparse => {}
        }
    }

    /// A grid turned transitional: move it to the heaviest neighbouring
    /// cluster it would join as an outside grid, or spawn a fresh
    /// singleton cluster.
    fn adjust_transitional(&mut self, key: &GridKey, label: Option<usize>) {
        if let Some((_, target)) = self.heaviest_neighbour(key, label, true) {
            self.assign_to_cluster(key.clone(), target);
            if let Some(own) = label {
                let emptied = match self.clusters.get_mut(own) {
                    Some(cluster) => {
                        cluster.remove_grid(key);
                        cluster.is_empty()
                    }
                    None => panic!("label {own} points at no live cluster"),
                };
                if emptied {
                    self.remove_cluster(own);
                }
            }
        } else {
            if let Some(own) = label {
                if let Some(cv) = self.grids.get_mut(key) {
                    cv.set_label(None);
                }
                let emptied = match self.clusters.get_mut(own) {
                    Some(cluster) => {
                        cluster.remove_grid(key);
                        cluster.is_empty()
                    }
                    None => panic!("label {own} points at no live cluster"),
                };
                if emptied {
                    self.remove_cluster(own);
                }
            }
            let label = self.clusters.next_label();
            if let Some(cv) = self.grids.get_mut(key) {
                cv.set_label(Some(label));
            }
            let mut cluster = GridCluster::new(label);
            cluster.add_grid(key.clone());
            self.clusters.push(cluster);
        }
    }

    /// Among the registry-present neighbours of `key`, the one whose
    /// cluster is heaviest — excluding `own` and unlabelled neighbours,
    /// first-seen winning ties. With `keep_outside`, candidates whose
    /// cluster `key` would join as an inside grid are skipped.
    fn heaviest_neighbour(
        &self,
        key: &GridKey,
        own: Option<usize>,
        keep_outside: bool,
    ) -> Option<(GridKey, usize)> {
        let mut best: Option<(GridKey, usize, usize)> = None;
        for neighbour in key.neighbours() {
            let Some(cv) = self.grids.get(&neighbour) else { continue };
            let Some(candidate) = cv.label() else { continue };
            if Some(candidate) == own {
                continue;
            }
            let cluster = match self.clusters.get(candidate) {
                Some(cluster) => cluster,
                None => panic!("label {candidate} points at no live cluster"),
            };
            // The grid's own membership never counts towards its inside
            // test, so plain is_inside answers "inside once added".
            if keep_outside && cluster.is_inside(key) {
                continue;
            }
            let weight = cluster.weight();
            if best.as_ref().map_or(true, |(_, _, b)| weight > *b) {
                best = Some((neighbour, candidate, weight));
            }
        }
        best.map(|(neighbour, candidate, _)| (neighbour, candidate))
    }

    /// Label `key` with `cluster` and admit it as a member.
    pub(crate) fn assign_to_cluster(&mut self, key: GridKey, cluster: usize) {
        if let Some(cv) = self.grids.get_mut(&key) {
            cv.set_label(Some(cluster));
        }
        match self.clusters.get_mut(cluster) {
            Some(target) => target.add_grid(key),
            None => panic!("label {cluster} points at no live cluster"),
        }
    }

    /// Merge cluster `small` into cluster `big`: relabel every grid of
    /// `small`, absorb its member set, then destroy `small` and compact
    /// the registry indices (updating every affected vector in lockstep).
    pub(crate) fn merge_clusters(&mut self, small: usize, big: usize) {
        debug_assert_ne!(small, big, "cannot merge a cluster into itself");
        for cv in self.grids.values_mut() {
            if cv.label() == Some(small) {
                cv.set_label(Some(big));
            }
        }
        let members = match self.clusters.get_mut(small) {
            Some(cluster) => cluster.take_grids(),
            None => panic!("label {small} points at no live cluster"),
        };
        match self.clusters.get_mut(big) {
            Some(cluster) => cluster.absorb(members),
            None => panic!("label {big} points at no live cluster"),
        }
        self.remove_cluster(small);
    }

    /// Destroy an emptied cluster and decrement every label above it.
    pub(crate) fn remove_cluster(&mut self, index: usize) {
        let removed = self.clusters.remove(index);
        assert!(
            removed.is_empty(),
            "destroying cluster {index} with live members"
        );
        for cv in self.grids.values_mut() {
            match cv.label() {
                Some(label) if label > index => cv.set_label(Some(label - 1)),
                Some(label) if label == index => {
                    panic!("grid still labelled with destroyed cluster {index}")
                }
                _ => {}
            }
        }
    }

    fn cluster_weight(&self, index: usize) -> usize {
        match self.clusters.get(index) {
            Some(cluster) => cluster.weight(),
            None => panic!("label {index} points at no live cluster"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{fast_decay_stream, key};
    use crate::grid::CharacteristicVector;

    /// Seed a grid with `hits` records at tick 0. With λ = 0.5 and N = 4
    /// (dl = 0.4, dm = 1.5): one hit is transitional, three are dense.
    fn seed_grid(stream: &mut DStream, coord: i64, hits: usize) {
        stream.model.recalibrate(4);
        let model = stream.model.clone();
        let cv = stream
            .grids
            .get_or_insert_with(key(coord), || CharacteristicVector::new(0, None, &model));
        for _ in 0..hits {
            cv.add_record(0, &model);
        }
    }

    /// Wrap existing grids into a cluster, labelling them in lockstep.
    fn seed_cluster(stream: &mut DStream, coords: &[i64]) -> usize {
        let label = stream.clusters.next_label();
        let mut cluster = GridCluster::new(label);
        for &coord in coords {
            stream
                .grids
                .get_mut(&key(coord))
                .expect("seed the grid first")
                .set_label(Some(label));
            cluster.add_grid(key(coord));
        }
        stream.clusters.push(cluster)
    }

    fn clear_pending_flags(stream: &mut DStream) {
        for cv in stream.grids.values_mut() {
            cv.clear_attribute_changed();
        }
    }

    #[test]
    fn test_initial_clustering_chains_adjacent_dense_grids() {
        let mut stream = fast_decay_stream(10);
        for coord in 0..3 {
            seed_grid(&mut stream, coord, 3);
        }
        seed_grid(&mut stream, 5, 1); // transitional, not adjacent

        stream.initial_clustering();
        stream.check_invariants();

        assert_eq!(stream.cluster_count(), 1, "adjacent dense grids chain up");
        let cluster = stream.clusters().next().unwrap();
        assert_eq!(cluster.weight(), 3);
        assert!(cluster.is_inside(&key(1)));
        assert!(!cluster.is_inside(&key(0)));
        assert!(!cluster.is_inside(&key(2)));
        assert_eq!(stream.grid(&key(5)).unwrap().label(), None);

        assert!(
            !stream.propagate_labels(),
            "a second propagation pass after the fixpoint must be a no-op"
        );
    }

    #[test]
    fn test_propagation_absorbs_transitional_neighbour() {
        let mut stream = fast_decay_stream(10);
        seed_grid(&mut stream, 0, 3);
        seed_grid(&mut stream, 1, 1);

        stream.initial_clustering();
        stream.check_invariants();

        assert_eq!(stream.cluster_count(), 1);
        let cluster = stream.clusters().next().unwrap();
        assert_eq!(cluster.weight(), 2);
        assert!(cluster.contains(&key(1)));
        assert_eq!(stream.grid(&key(1)).unwrap().label(), Some(0));
    }

    #[test]
    fn test_merge_compacts_labels_and_vectors() {
        let mut stream = fast_decay_stream(10);
        for coord in [0, 10, 20] {
            seed_grid(&mut stream, coord, 3);
        }
        seed_cluster(&mut stream, &[0]);
        seed_cluster(&mut stream, &[10]);
        seed_cluster(&mut stream, &[20]);

        stream.merge_clusters(0, 2);
        stream.check_invariants();

        assert_eq!(stream.cluster_count(), 2);
        // Old cluster 1 slid down to 0; the merged cluster (old 2) to 1.
        assert_eq!(stream.grid(&key(10)).unwrap().label(), Some(0));
        assert_eq!(stream.grid(&key(0)).unwrap().label(), Some(1));
        assert_eq!(stream.grid(&key(20)).unwrap().label(), Some(1));
        let merged = stream.cluster(1).unwrap();
        assert!(merged.contains(&key(0)) && merged.contains(&key(20)));
    }

    #[test]
    fn test_adjust_detaches_sparse_grid_and_destroys_empty_cluster() {
        let mut stream = fast_decay_stream(10);
        seed_grid(&mut stream, 0, 1);
        seed_cluster(&mut stream, &[0]);
        clear_pending_flags(&mut stream);

        // Ten ticks of decay pull the grid under dl at the refresh.
        stream.tc = 10;
        stream.adjust_clustering();
        stream.check_invariants();

        assert_eq!(stream.cluster_count(), 0, "emptied cluster is destroyed");
        assert_eq!(stream.grid(&key(0)).unwrap().label(), None);
        assert_eq!(
            stream.grid(&key(0)).unwrap().attribute(),
            GridAttribute::Sparse
        );
    }

    #[test]
    fn test_adjust_dense_joins_heaviest_neighbouring_cluster() {
        let mut stream = fast_decay_stream(10);
        for coord in [10, 11, 13] {
            seed_grid(&mut stream, coord, 3);
        }
        seed_cluster(&mut stream, &[10, 11]);
        seed_cluster(&mut stream, &[13]);
        clear_pending_flags(&mut stream);

        // A new dense grid between the two clusters.
        seed_grid(&mut stream, 12, 3);
        stream.adjust_clustering();
        stream.check_invariants();

        assert_eq!(stream.grid(&key(12)).unwrap().label(), Some(0), "joins the heavier cluster");
        assert_eq!(stream.cluster(0).unwrap().weight(), 3);
        assert_eq!(stream.cluster(1).unwrap().weight(), 1);
        assert!(stream.cluster(0).unwrap().is_inside(&key(11)));
    }

    #[test]
    fn test_adjust_dense_merges_labelled_grid_with_dense_neighbour() {
        let mut stream = fast_decay_stream(10);
        seed_grid(&mut stream, 0, 1); // transitional for now
        seed_grid(&mut stream, 1, 3);
        seed_grid(&mut stream, 2, 3);
        seed_cluster(&mut stream, &[0]);
        seed_cluster(&mut stream, &[1, 2]);
        clear_pending_flags(&mut stream);

        // Two more hits push (0) over dm: a pending dense transition in
        // a labelled grid whose dense neighbour sits in a heavier cluster.
        seed_grid(&mut stream, 0, 2);
        assert!(stream.grid(&key(0)).unwrap().attribute_changed());
        stream.adjust_clustering();
        stream.check_invariants();

        assert_eq!(stream.cluster_count(), 1, "lighter cluster merged away");
        let cluster = stream.clusters().next().unwrap();
        assert_eq!(cluster.weight(), 3);
        for coord in 0..3 {
            assert_eq!(stream.grid(&key(coord)).unwrap().label(), Some(0));
        }
        assert!(cluster.is_inside(&key(1)));
    }

    #[test]
    fn test_adjust_dense_moves_transitional_neighbour_into_heavier_cluster() {
        let mut stream = fast_decay_stream(10);
        seed_grid(&mut stream, 0, 3);
        seed_grid(&mut stream, 1, 1); // transitional for now
        seed_grid(&mut stream, 2, 1); // transitional
        seed_cluster(&mut stream, &[0, 1]);
        seed_cluster(&mut stream, &[2]);
        clear_pending_flags(&mut stream);

        // (1) turns dense; its only foreign neighbour (2) is transitional
        // in a lighter cluster, so (2) is pulled across.
        seed_grid(&mut stream, 1, 2);
        stream.adjust_clustering();
        stream.check_invariants();

        assert_eq!(stream.cluster_count(), 1, "emptied donor cluster destroyed");
        let cluster = stream.clusters().next().unwrap();
        assert_eq!(cluster.weight(), 3);
        assert_eq!(stream.grid(&key(2)).unwrap().label(), Some(0));
        assert!(cluster.is_inside(&key(1)));
    }

    #[test]
    fn test_adjust_transitional_prefers_heavier_cluster_it_stays_outside_of() {
        let mut stream = fast_decay_stream(10);
        seed_grid(&mut stream, 0, 3);
        seed_grid(&mut stream, 1, 3);
        seed_grid(&mut stream, 3, 3);
        seed_cluster(&mut stream, &[0, 1]);
        seed_cluster(&mut stream, &[3]);
        clear_pending_flags(&mut stream);

        seed_grid(&mut stream, 2, 1); // transitional newcomer, flag pending
        stream.adjust_clustering();
        stream.check_invariants();

        assert_eq!(stream.grid(&key(2)).unwrap().label(), Some(0));
        assert_eq!(stream.cluster(0).unwrap().weight(), 3);
        assert_eq!(stream.cluster(1).unwrap().weight(), 1);
        assert!(!stream.cluster(0).unwrap().is_inside(&key(2)));
    }

    #[test]
    fn test_adjust_transitional_spawns_singleton_when_it_would_be_inside() {
        let mut stream = fast_decay_stream(10);
        seed_grid(&mut stream, 0, 3);
        seed_grid(&mut stream, 2, 3);
        seed_cluster(&mut stream, &[0, 2]);
        clear_pending_flags(&mut stream);

        // (1) would be an inside grid of the only candidate cluster, so
        // it gets a fresh singleton with the next dense label.
        seed_grid(&mut stream, 1, 1);
        stream.adjust_clustering();
        stream.check_invariants();

        assert_eq!(stream.cluster_count(), 2);
        assert_eq!(stream.grid(&key(1)).unwrap().label(), Some(1));
        let singleton = stream.cluster(1).unwrap();
        assert_eq!(singleton.weight(), 1);
        assert!(singleton.contains(&key(1)));
    }

    #[test]
    fn test_adjust_dense_respects_outside_gate_of_transitional_neighbour() {
        // Blocked: h = (3) would become an inside grid of its cluster
        // once (2) joins, so the unlabelled dense grid stays NO_CLASS.
        let mut stream = fast_decay_stream(10);
        seed_grid(&mut stream, 3, 1);
        seed_grid(&mut stream, 4, 1);
        seed_cluster(&mut stream, &[3, 4]);
        clear_pending_flags(&mut stream);
        seed_grid(&mut stream, 2, 3);
        stream.adjust_clustering();
        stream.check_invariants();
        assert_eq!(stream.grid(&key(2)).unwrap().label(), None);

        // Allowed: with a singleton cluster, h keeps an absent neighbour
        // and stays outside, so the dense grid joins.
        let mut stream = fast_decay_stream(10);
        seed_grid(&mut stream, 3, 1);
        seed_cluster(&mut stream, &[3]);
        clear_pending_flags(&mut stream);
        seed_grid(&mut stream, 2, 3);
        stream.adjust_clustering();
        stream.check_invariants();
        assert_eq!(stream.grid(&key(2)).unwrap().label(), Some(0));
        assert_eq!(stream.cluster(0).unwrap().weight(), 2);
    }
}
