//! The record interface consumed by the stream driver.
//!
//! The engine clusters the data *space*, not the records themselves, so all
//! it needs from a record is its arity, the kind of each attribute, and the
//! attribute values. Numeric attributes are discretized by flooring; nominal
//! attributes carry their category index as the value and declare how many
//! categories exist (used to size the grid space).

use serde::{Deserialize, Serialize};

/// The kind of a record attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// A continuous attribute; mapped to the floor of its value.
    Numeric,
    /// A categorical attribute with a known number of categories; the
    /// value is the category index.
    Nominal {
        /// Number of categories declared for this attribute.
        values: usize,
    },
}

/// A single multi-dimensional record of the stream.
///
/// Implement this for your own row type to feed it to
/// [`DStream::ingest`](crate::DStream::ingest); plain `[f64]` slices work
/// out of the box for all-numeric data, and [`SimpleRecord`] covers mixed
/// numeric/nominal schemas.
pub trait Record {
    /// Number of attributes. Must not change over the stream's lifetime.
    fn num_attributes(&self) -> usize;

    /// Kind of the attribute at `index`.
    fn attribute_kind(&self, index: usize) -> AttributeKind;

    /// Value of the attribute at `index`. For nominal attributes this is
    /// the category index.
    fn value(&self, index: usize) -> f64;
}

/// All-numeric records can be fed as plain slices.
impl Record for [f64] {
    fn num_attributes(&self) -> usize {
        self.len()
    }

    fn attribute_kind(&self, _index: usize) -> AttributeKind {
        AttributeKind::Numeric
    }

    fn value(&self, index: usize) -> f64 {
        self[index]
    }
}

/// A concrete record with an explicit per-attribute schema.
///
/// # Example
///
/// ```rust
/// use gridstream::{AttributeKind, Record, SimpleRecord};
///
/// // (protocol: one of 3 categories, size: numeric)
/// let record = SimpleRecord::new(
///     vec![AttributeKind::Nominal { values: 3 }, AttributeKind::Numeric],
///     vec![2.0, 17.4],
/// );
/// assert_eq!(record.num_attributes(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct SimpleRecord {
    kinds: Vec<AttributeKind>,
    values: Vec<f64>,
}

impl SimpleRecord {
    /// Create a record from a schema and a value row.
    ///
    /// # Panics
    ///
    /// Panics if the schema and value row lengths differ.
    pub fn new(kinds: Vec<AttributeKind>, values: Vec<f64>) -> Self {
        assert_eq!(
            kinds.len(),
            values.len(),
            "schema and value row must have the same length"
        );
        Self { kinds, values }
    }

    /// Create an all-numeric record.
    pub fn numeric(values: Vec<f64>) -> Self {
        let kinds = vec![AttributeKind::Numeric; values.len()];
        Self { kinds, values }
    }
}

impl Record for SimpleRecord {
    fn num_attributes(&self) -> usize {
        self.values.len()
    }

    fn attribute_kind(&self, index: usize) -> AttributeKind {
        self.kinds[index]
    }

    fn value(&self, index: usize) -> f64 {
        self.values[index]
    }
}
