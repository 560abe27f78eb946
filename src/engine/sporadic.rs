//! Sporadic-grid detection and eviction.
//!
//! Most grids of a real stream receive a handful of outlier records and
//! never become dense; left alone they would dominate the registry. The
//! sweep runs every gap boundary (before the adjustment pass) and applies
//! the two-rule test:
//!
//! - **S1** — the stored density is below the time-dependent threshold
//!   `π(tg)`, which climbs towards `dl` the longer the grid goes without
//!   a record;
//! - **S2** — the grid was never evicted before, or the β protection
//!   window since its last eviction has passed.
//!
//! A grid satisfying both is flagged; a grid still flagged one cycle
//! later whose last record is more than `gap` ticks old is deleted, with
//! its eviction tick remembered so a reappearing coordinate cannot be
//! flagged again until the β window clears.

use super::DStream;
use crate::grid::GridKey;

impl DStream {
    /// One sweep over the registry: delete stale flagged grids,
    /// re-evaluate everything else.
    pub(crate) fn remove_sporadic(&mut self) {
        for key in self.grids.keys_snapshot() {
            let Some(cv) = self.grids.get(&key) else { continue };

            if cv.is_sporadic() && self.tc - cv.update_time() > self.model.gap() {
                let label = cv.label();
                self.grids.remove(&key);
                self.removed.insert(key.clone(), self.tc);
                if let Some(own) = label {
                    let emptied = match self.clusters.get_mut(own) {
                        Some(cluster) => {
                            cluster.remove_grid(&key);
                            cluster.is_empty()
                        }
                        None => panic!("label {own} points at no live cluster"),
                    };
                    if emptied {
                        self.remove_cluster(own);
                    }
                }
            } else {
                let flag = self.is_sporadic_candidate(&key);
                if let Some(cv) = self.grids.get_mut(&key) {
                    cv.set_sporadic(flag);
                }
            }
        }
    }

    /// The S1 ∧ S2 predicate for one grid.
    fn is_sporadic_candidate(&self, key: &GridKey) -> bool {
        let Some(cv) = self.grids.get(key) else { return false };

        let s1 = cv.density() < self.model.pi(cv.update_time(), self.tc);
        let s2 = match cv.remove_time() {
            None => true,
            Some(tm) => self.tc as f64 >= (1.0 + self.model.beta()) * tm as f64,
        };
        s1 && s2
    }
}
