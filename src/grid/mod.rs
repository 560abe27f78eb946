//! Grid layer: lattice keys, per-grid metadata, and the registry that
//! owns them.
//!
//! This layer has no knowledge of clusters; the characteristic vector
//! stores a cluster label as an opaque index that the
//! [`engine`](crate::engine) keeps consistent with the cluster registry.

pub mod charvec;
pub mod key;
pub mod registry;

pub use charvec::CharacteristicVector;
pub use key::{GridKey, Neighbours};
pub use registry::GridRegistry;
