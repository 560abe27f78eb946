//! Engine layer: the stream driver plus the clustering and sporadic passes.
//!
//! [`DStream`] owns the grid and cluster registries and consumes records
//! one at a time. Every `gap` ticks it runs a clustering cycle: the first
//! cycle bulk-clusters all dense grids, every later cycle first sweeps out
//! sporadic grids and then incrementally adjusts the clustering around
//! grids whose density class changed.
//!
//! All state transitions are synchronous on the caller's thread; after
//! every return from [`DStream::ingest`] the engine state is coherent.
//!
//! # Example
//!
//! ```rust
//! use gridstream::{DStream, StreamConfig};
//!
//! let config = StreamConfig {
//!     decay_factor: 0.5,
//!     time_gap: Some(4),
//!     ..StreamConfig::default()
//! };
//! let mut stream = DStream::new(config).unwrap();
//!
//! for value in [0.0, 3.0, 1.0, 1.0, 1.0] {
//!     stream.ingest(&[value][..]).unwrap();
//! }
//!
//! for cluster in stream.clusters() {
//!     println!("cluster {}: {} grids", cluster.label(), cluster.weight());
//! }
//! ```

mod clustering;
mod sporadic;

use crate::cluster::{ClusterRegistry, GridCluster};
use crate::config::StreamConfig;
use crate::density::DensityModel;
use crate::error::{Result, StreamError};
use crate::grid::{CharacteristicVector, GridKey, GridRegistry};
use crate::record::{AttributeKind, Record};
use std::collections::HashMap;

/// The density-grid stream clustering engine.
///
/// Created from a validated [`StreamConfig`]; the dimensionality and the
/// per-attribute schema are fixed by the first record.
pub struct DStream {
    pub(crate) model: DensityModel,
    /// Current internal tick; one record per tick.
    pub(crate) tc: u64,
    /// Per-attribute schema, fixed at the first record. Empty until then.
    pub(crate) attributes: Vec<AttributeKind>,
    /// Smallest observed coordinate per numeric dimension.
    pub(crate) min_vals: Vec<i64>,
    /// Largest observed coordinate per numeric dimension.
    pub(crate) max_vals: Vec<i64>,
    pub(crate) grids: GridRegistry,
    pub(crate) clusters: ClusterRegistry,
    /// Last removal tick per evicted coordinate, so a reinsertion resumes
    /// with its `tm` and the β protection window applies across evictions.
    pub(crate) removed: HashMap<GridKey, u64>,
    /// Whether the one-time initial clustering has run.
    pub(crate) initial_done: bool,
}

impl DStream {
    /// Create an engine from a configuration.
    ///
    /// Fails fast on any out-of-range parameter; the engine never starts
    /// consuming records with an invalid configuration.
    pub fn new(config: StreamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model: DensityModel::new(&config),
            tc: 0,
            attributes: Vec::new(),
            min_vals: Vec::new(),
            max_vals: Vec::new(),
            grids: GridRegistry::new(),
            clusters: ClusterRegistry::new(),
            removed: HashMap::new(),
            initial_done: false,
        })
    }

    /// Consume one record.
    ///
    /// Maps the record to its grid, applies the density update, and at gap
    /// boundaries runs the clustering cycle. Records are processed in
    /// arrival order; the tick advances by one per record.
    ///
    /// # Errors
    ///
    /// [`StreamError::SchemaMismatch`] if the record's attribute count
    /// differs from the first record's; the record is not ingested.
    pub fn ingest<R: Record + ?Sized>(&mut self, record: &R) -> Result<()> {
        let d = record.num_attributes();
        let mut recalibrate = false;

        if self.attributes.is_empty() {
            self.attributes = (0..d).map(|i| record.attribute_kind(i)).collect();
            self.min_vals = vec![0; d];
            self.max_vals = vec![0; d];
            for i in 0..d {
                if self.attributes[i] == AttributeKind::Numeric {
                    let c = record.value(i).floor() as i64;
                    self.min_vals[i] = c;
                    self.max_vals[i] = c;
                }
            }
            recalibrate = true;
        } else if d != self.attributes.len() {
            return Err(StreamError::SchemaMismatch {
                expected: self.attributes.len(),
                got: d,
            });
        }

        let mut coords = Vec::with_capacity(d);
        for i in 0..d {
            match self.attributes[i] {
                AttributeKind::Numeric => {
                    let c = record.value(i).floor() as i64;
                    if c > self.max_vals[i] {
                        self.max_vals[i] = c;
                        recalibrate = true;
                    }
                    if c < self.min_vals[i] {
                        self.min_vals[i] = c;
                        recalibrate = true;
                    }
                    coords.push(c);
                }
                AttributeKind::Nominal { values } => {
                    let c = record.value(i) as i64;
                    let mut known = values;
                    if let AttributeKind::Nominal { values: declared } = record.attribute_kind(i) {
                        known = known.max(declared);
                    }
                    if c >= 0 {
                        // An unseen category index widens the space.
                        known = known.max(c as usize + 1);
                    }
                    if known > values {
                        self.attributes[i] = AttributeKind::Nominal { values: known };
                        recalibrate = true;
                    }
                    coords.push(c);
                }
            }
        }

        if recalibrate {
            let n = self.grid_space_size();
            self.model.recalibrate(n);
        }

        let key = GridKey::new(coords);
        let remove_time = if self.grids.contains(&key) {
            None
        } else {
            self.removed.remove(&key)
        };
        let tc = self.tc;
        let model = &self.model;
        let cv = self
            .grids
            .get_or_insert_with(key, || CharacteristicVector::new(tc, remove_time, model));
        cv.add_record(tc, model);

        if self.tc != 0 && self.tc % self.model.gap() == 0 {
            if self.initial_done {
                self.remove_sporadic();
                self.adjust_clustering();
            } else {
                self.initial_clustering();
                self.initial_done = true;
            }
        }

        self.tc += 1;
        Ok(())
    }

    /// The live clusters, in label order.
    ///
    /// Empty before the first clustering cycle.
    pub fn clusters(&self) -> impl Iterator<Item = &GridCluster> {
        self.clusters.iter()
    }

    /// The cluster with the given label, if live.
    pub fn cluster(&self, label: usize) -> Option<&GridCluster> {
        self.clusters.get(label)
    }

    /// Number of live clusters.
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// 1.0 iff the record maps to a grid currently in the given cluster,
    /// else 0.0 (including before initialization and on arity mismatch).
    pub fn inclusion_probability<R: Record + ?Sized>(&self, record: &R, cluster: usize) -> f64 {
        match (self.key_for(record), self.clusters.get(cluster)) {
            (Some(key), Some(target)) if target.contains(&key) => 1.0,
            _ => 0.0,
        }
    }

    /// The characteristic vector of a grid, if live.
    pub fn grid(&self, key: &GridKey) -> Option<&CharacteristicVector> {
        self.grids.get(key)
    }

    /// Iterate over all live grids.
    pub fn grids(&self) -> impl Iterator<Item = (&GridKey, &CharacteristicVector)> {
        self.grids.iter()
    }

    /// Number of live grids.
    pub fn grid_count(&self) -> usize {
        self.grids.len()
    }

    /// Current internal tick.
    pub fn tick(&self) -> u64 {
        self.tc
    }

    /// Current gap between clustering cycles.
    pub fn gap(&self) -> u64 {
        self.model.gap()
    }

    /// Current grid-space size N.
    pub fn n(&self) -> u64 {
        self.model.n()
    }

    /// Current sparse threshold dl.
    pub fn dl(&self) -> f64 {
        self.model.dl()
    }

    /// Current dense threshold dm.
    pub fn dm(&self) -> f64 {
        self.model.dm()
    }

    /// The full density model (thresholds, λ, β, gap).
    pub fn model(&self) -> &DensityModel {
        &self.model
    }

    /// Map a record to its grid key without touching the range trackers.
    fn key_for<R: Record + ?Sized>(&self, record: &R) -> Option<GridKey> {
        if self.attributes.is_empty() || record.num_attributes() != self.attributes.len() {
            return None;
        }
        let coords = self
            .attributes
            .iter()
            .enumerate()
            .map(|(i, kind)| match kind {
                AttributeKind::Numeric => record.value(i).floor() as i64,
                AttributeKind::Nominal { .. } => record.value(i) as i64,
            })
            .collect();
        Some(GridKey::new(coords))
    }

    /// `N = Π_i p_i`: category count for nominal dimensions, observed
    /// `1 + max − min` for numeric ones.
    fn grid_space_size(&self) -> u64 {
        let mut n: u64 = 1;
        for (i, kind) in self.attributes.iter().enumerate() {
            let partitions = match kind {
                AttributeKind::Numeric => (self.max_vals[i] - self.min_vals[i] + 1) as u64,
                AttributeKind::Nominal { values } => (*values).max(1) as u64,
            };
            n = n.saturating_mul(partitions);
        }
        n
    }
}
