//! Characteristic vectors: the per-grid metadata bundle.
//!
//! Each live grid carries `(tg, tm, D, label, status, attribute,
//! attribute_changed)`:
//!
//! - `tg` — tick of the last *record* landing in the grid,
//! - `tm` — tick of the last removal as sporadic, if ever,
//! - `D` — the exponentially decayed density,
//! - `label` — index into the cluster registry, if assigned,
//! - `status` — the sporadic flag,
//! - `attribute` — SPARSE / TRANSITIONAL / DENSE, cached at the last
//!   density update,
//! - `attribute_changed` — pending attribute transition, consumed by the
//!   clustering engine.
//!
//! Density is decayed lazily: the vector also tracks the tick the stored
//! value was last decayed to, so a bulk refresh ages the density without
//! touching `tg` — `tg` is what the sporadic rules measure staleness by,
//! and only records move it.

use crate::density::{DensityModel, GridAttribute};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mutable metadata of one density grid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CharacteristicVector {
    /// Tick of the last record update (tg).
    update_time: u64,
    /// Tick the stored density is valued at. Advanced by every decay,
    /// record or refresh alike.
    decay_time: u64,
    /// Tick of the last removal as sporadic (tm), if ever.
    remove_time: Option<u64>,
    /// Decayed density (D).
    density: f64,
    /// Cluster label, if assigned.
    label: Option<usize>,
    /// Sporadic flag (status).
    sporadic: bool,
    /// Density class cached at the last update.
    attribute: GridAttribute,
    /// Attribute transition pending since the last clustering cycle.
    attribute_changed: bool,
}

impl CharacteristicVector {
    /// A fresh vector for a grid created at tick `tc`.
    ///
    /// `remove_time` carries the last removal tick when the same
    /// coordinate was previously evicted as sporadic.
    pub fn new(tc: u64, remove_time: Option<u64>, model: &DensityModel) -> Self {
        Self {
            update_time: tc,
            decay_time: tc,
            remove_time,
            density: 0.0,
            label: None,
            sporadic: false,
            attribute: model.classify(0.0),
            attribute_changed: false,
        }
    }

    /// Density update for a record landing in the grid at tick `tc`:
    /// `D ← λ^(tc − decay_time) · D + 1`, `tg ← tc`.
    pub fn add_record(&mut self, tc: u64, model: &DensityModel) {
        self.density = model.decay(self.density, tc - self.decay_time) + 1.0;
        self.update_time = tc;
        self.decay_time = tc;
        self.reclassify(model);
    }

    /// Bulk density refresh at tick `tc`: `D ← λ^(tc − decay_time) · D`.
    ///
    /// Idempotent at a fixed tick; `tg` is untouched.
    pub fn refresh(&mut self, tc: u64, model: &DensityModel) {
        self.density = model.decay(self.density, tc - self.decay_time);
        self.decay_time = tc;
        self.reclassify(model);
    }

    /// Recompute the cached attribute, accumulating the pending-change
    /// flag until a clustering pass consumes it. Label and sporadic-flag
    /// changes never touch the flag.
    fn reclassify(&mut self, model: &DensityModel) {
        let attribute = model.classify(self.density);
        if attribute != self.attribute {
            self.attribute = attribute;
            self.attribute_changed = true;
        }
    }

    /// Tick of the last record update (tg).
    pub fn update_time(&self) -> u64 {
        self.update_time
    }

    /// Tick of the last removal as sporadic (tm), if ever.
    pub fn remove_time(&self) -> Option<u64> {
        self.remove_time
    }

    /// The decayed density (D).
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Cluster label, if assigned.
    pub fn label(&self) -> Option<usize> {
        self.label
    }

    /// The sporadic flag.
    pub fn is_sporadic(&self) -> bool {
        self.sporadic
    }

    /// Density class cached at the last update.
    pub fn attribute(&self) -> GridAttribute {
        self.attribute
    }

    /// True iff an attribute transition is pending.
    pub fn attribute_changed(&self) -> bool {
        self.attribute_changed
    }

    pub(crate) fn set_label(&mut self, label: Option<usize>) {
        self.label = label;
    }

    pub(crate) fn set_sporadic(&mut self, sporadic: bool) {
        self.sporadic = sporadic;
    }

    pub(crate) fn clear_attribute_changed(&mut self) {
        self.attribute_changed = false;
    }
}

impl fmt::Display for CharacteristicVector {
    /// Debug text format: `<A> <tg> <tm> <D> <class> <Sporadic|Normal> [CHANGED]`,
    /// with `tm` and `class` printed as -1 when unset.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tm = self.remove_time.map_or(-1, |t| t as i64);
        let class = self.label.map_or(-1, |l| l as i64);
        let status = if self.sporadic { "Sporadic" } else { "Normal" };
        write!(
            f,
            "{} {} {} {:.4} {} {}",
            self.attribute.letter(),
            self.update_time,
            tm,
            self.density,
            class,
            status
        )?;
        if self.attribute_changed {
            write!(f, " CHANGED")?;
        }
        Ok(())
    }
}
