//! Grid keys: integer coordinates on the discretized data-space lattice.
//!
//! A d-dimensional record falls into exactly one axis-aligned cell of the
//! lattice, identified by the d-tuple of its discretized coordinates.
//! Two cells are neighbours iff they differ in exactly one coordinate by
//! exactly 1, so every cell has 2d lattice neighbours.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one density grid: a fixed-length tuple of signed integer
/// coordinates. Equality and hashing are component-wise.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct GridKey {
    coords: Vec<i64>,
}

impl GridKey {
    /// Create a key from its coordinates.
    pub fn new(coords: Vec<i64>) -> Self {
        Self { coords }
    }

    /// The coordinates.
    pub fn coords(&self) -> &[i64] {
        &self.coords
    }

    /// Number of dimensions.
    pub fn dims(&self) -> usize {
        self.coords.len()
    }

    /// A copy of this key with one coordinate varied by `delta`.
    pub fn offset(&self, dim: usize, delta: i64) -> GridKey {
        let mut coords = self.coords.clone();
        coords[dim] += delta;
        GridKey { coords }
    }

    /// Lazy iterator over the 2d lattice neighbours of this cell.
    ///
    /// Neighbours are yielded per dimension, minus side first; callers that
    /// stop early never pay for the rest.
    pub fn neighbours(&self) -> Neighbours<'_> {
        Neighbours { key: self, next: 0 }
    }

    /// True iff the two keys differ in exactly one coordinate by exactly 1.
    pub fn is_neighbour(&self, other: &GridKey) -> bool {
        if self.dims() != other.dims() {
            return false;
        }

        let mut total = 0i64;
        for (a, b) in self.coords.iter().zip(other.coords.iter()) {
            let diff = (a - b).abs();
            if diff > 1 {
                return false;
            }
            total += diff;
        }
        total == 1
    }
}

impl From<Vec<i64>> for GridKey {
    fn from(coords: Vec<i64>) -> Self {
        Self::new(coords)
    }
}

impl fmt::Display for GridKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}

/// Iterator over a key's 2d lattice neighbours. See [`GridKey::neighbours`].
pub struct Neighbours<'a> {
    key: &'a GridKey,
    next: usize,
}

impl Iterator for Neighbours<'_> {
    type Item = GridKey;

    fn next(&mut self) -> Option<GridKey> {
        if self.next >= 2 * self.key.dims() {
            return None;
        }
        let dim = self.next / 2;
        let delta = if self.next % 2 == 0 { -1 } else { 1 };
        self.next += 1;
        Some(self.key.offset(dim, delta))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = 2 * self.key.dims() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Neighbours<'_> {}
