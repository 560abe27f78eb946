//! # Gridstream: Density-Based Stream Clustering
//!
//! Gridstream is an online clustering engine for unbounded record streams,
//! implementing the density-grid approach of the D-Stream algorithm
//! (Chen & Tu, KDD 2007). Instead of clustering individual records, it
//! partitions the data space into a lattice of axis-aligned grids, keeps a
//! time-decayed density per grid, and reports groups of connected dense
//! grids as clusters.
//!
//! ## Quick Start
//!
//! ```rust
//! use gridstream::{DStream, StreamConfig};
//!
//! let config = StreamConfig {
//!     decay_factor: 0.5,
//!     time_gap: Some(5),
//!     ..StreamConfig::default()
//! };
//! let mut stream = DStream::new(config)?;
//!
//! // Feed records one at a time; plain slices work for numeric data.
//! for tick in 0..100u64 {
//!     let value = if tick % 2 == 0 { 1.0 } else { 20.0 };
//!     stream.ingest(&[value][..])?;
//! }
//!
//! // Two well-separated attractors become two clusters.
//! for cluster in stream.clusters() {
//!     println!("cluster {}: {} grids", cluster.label(), cluster.weight());
//! }
//! # Ok::<(), gridstream::StreamError>(())
//! ```
//!
//! ## Core Concepts
//!
//! - **Density grid**: one cell of the lattice, identified by a [`GridKey`]
//! - **Characteristic vector**: per-grid metadata — decayed density, last
//!   update tick, cluster label, sporadic flag
//! - **Dense / transitional / sparse**: density classes relative to the
//!   thresholds `dm` and `dl`, which scale with the observed data range
//! - **Grid cluster**: a connected group of dense grids plus transitional
//!   grids on its rim
//! - **Sporadic grid**: a stale low-density grid, periodically evicted to
//!   keep memory proportional to the live part of the space
//!
//! Every `gap` ticks the engine runs a clustering cycle; the gap is
//! derived from the decay factor and the space size so that a grid cannot
//! swing between dense and sparse within a single cycle, or it can be
//! pinned via [`StreamConfig::time_gap`].

pub mod cluster;
pub mod config;
pub mod density;
pub mod engine;
pub mod error;
pub mod grid;
pub mod record;

// Re-exports for convenience
pub use cluster::{ClusterRegistry, GridCluster};
pub use config::StreamConfig;
pub use density::{DensityModel, GridAttribute};
pub use engine::DStream;
pub use error::{Result, StreamError};
pub use grid::{CharacteristicVector, GridKey, GridRegistry};
pub use record::{AttributeKind, Record, SimpleRecord};
