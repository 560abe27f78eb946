//! Density engine: decay arithmetic, attribute thresholds, gap derivation
//! and the sporadicity threshold π.
//!
//! Every grid carries a time-decayed density `D`. A record landing in a
//! grid adds 1 after aging the stored value by λ per elapsed tick, so the
//! total density of the stream converges to `1 / (1 − λ)` — which is why
//! the dense and sparse thresholds are expressed as fractions of
//! `1 / (N · (1 − λ))`, the average share of one grid out of `N`.
//!
//! # Key Insight
//!
//! Thresholds depend on the grid-space size `N`, and `N` is only known
//! from the data (the observed coordinate range). Whenever the range
//! grows, `dl`, `dm` and the derived gap must all be recomputed; densities
//! themselves are untouched and may silently reclassify at their next
//! update.

use crate::config::StreamConfig;
use serde::{Deserialize, Serialize};

/// Density class of a grid, relative to the thresholds `(dl, dm)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridAttribute {
    /// `D <= dl`
    Sparse,
    /// `dl < D < dm`
    Transitional,
    /// `D >= dm`
    Dense,
}

impl GridAttribute {
    /// One-letter tag used by the debug text format.
    pub fn letter(&self) -> char {
        match self {
            GridAttribute::Sparse => 'S',
            GridAttribute::Transitional => 'T',
            GridAttribute::Dense => 'D',
        }
    }
}

/// Decay and threshold state derived from the configuration and the
/// current grid-space size.
///
/// Owned by the stream driver; recalibrated via [`DensityModel::recalibrate`]
/// every time the observed coordinate range (and therefore `N`) grows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DensityModel {
    lambda: f64,
    cm: f64,
    cl: f64,
    beta: f64,
    pinned_gap: Option<u64>,
    n: u64,
    dl: f64,
    dm: f64,
    gap: u64,
}

impl DensityModel {
    /// Build a model from a validated configuration.
    ///
    /// Thresholds start unreachable; the driver recalibrates on the first
    /// record, before any grid is classified.
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            lambda: config.decay_factor,
            cm: config.cm,
            cl: config.cl,
            beta: config.beta,
            pinned_gap: config.time_gap,
            n: 0,
            dl: f64::INFINITY,
            dm: f64::INFINITY,
            gap: config.time_gap.unwrap_or(1),
        }
    }

    /// Recompute `dl`, `dm` and (unless pinned) the gap for a new
    /// grid-space size `n`.
    pub fn recalibrate(&mut self, n: u64) {
        self.n = n;
        let scale = n as f64 * (1.0 - self.lambda);
        self.dl = self.cl / scale;
        self.dm = self.cm / scale;
        self.gap = match self.pinned_gap {
            Some(gap) => gap,
            None => self.derive_gap(),
        };
    }

    /// Gap derivation: `⌊min(log_λ(Cl/Cm), log_λ((N−Cm)/(N−Cl)))⌋`.
    ///
    /// The second branch is undefined while `N <= Cm`; non-finite or
    /// non-positive candidates are discarded and the result is clamped
    /// to at least 1.
    fn derive_gap(&self) -> u64 {
        let n = self.n as f64;
        let ln_lambda = self.lambda.ln();
        let candidates = [
            (self.cl / self.cm).ln() / ln_lambda,
            ((n - self.cm) / (n - self.cl)).ln() / ln_lambda,
        ];

        let mut best = f64::INFINITY;
        for candidate in candidates {
            if candidate.is_finite() && candidate > 0.0 {
                best = best.min(candidate);
            }
        }

        if best.is_finite() {
            (best.floor() as u64).max(1)
        } else {
            1
        }
    }

    /// Classify a density value against the current thresholds.
    pub fn classify(&self, density: f64) -> GridAttribute {
        if density >= self.dm {
            GridAttribute::Dense
        } else if density <= self.dl {
            GridAttribute::Sparse
        } else {
            GridAttribute::Transitional
        }
    }

    /// Age a stored density by `elapsed` ticks.
    pub fn decay(&self, density: f64, elapsed: u64) -> f64 {
        self.lambda.powf(elapsed as f64) * density
    }

    /// The sporadicity threshold `π(tg) = Cl · (1 − λ^(tc − tg + 1)) / (N · (1 − λ))`.
    ///
    /// Monotone in `tc − tg`: the longer a grid goes without a record, the
    /// higher the bar its stored density must clear to stay non-sporadic.
    pub fn pi(&self, tg: u64, tc: u64) -> f64 {
        let exponent = (tc - tg + 1) as f64;
        self.cl * (1.0 - self.lambda.powf(exponent)) / (self.n as f64 * (1.0 - self.lambda))
    }

    /// Decay factor λ.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Sporadic protection window β.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Current grid-space size N.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Sparse threshold dl.
    pub fn dl(&self) -> f64 {
        self.dl
    }

    /// Dense threshold dm.
    pub fn dm(&self) -> f64 {
        self.dm
    }

    /// Current gap between clustering cycles.
    pub fn gap(&self) -> u64 {
        self.gap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(lambda: f64, cm: f64, cl: f64, time_gap: Option<u64>) -> DensityModel {
        DensityModel::new(&StreamConfig {
            decay_factor: lambda,
            cm,
            cl,
            beta: 0.3,
            time_gap,
        })
    }

    #[test]
    fn test_thresholds_scale_with_n() {
        let mut m = model(0.5, 3.0, 0.8, None);
        m.recalibrate(4);

        assert!((m.dl() - 0.4).abs() < 1e-12, "dl = Cl / (N(1-λ)), got {}", m.dl());
        assert!((m.dm() - 1.5).abs() < 1e-12, "dm = Cm / (N(1-λ)), got {}", m.dm());

        m.recalibrate(8);
        assert!((m.dl() - 0.2).abs() < 1e-12);
        assert!((m.dm() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_classify_boundaries() {
        let mut m = model(0.5, 3.0, 0.8, None);
        m.recalibrate(4); // dl = 0.4, dm = 1.5

        assert_eq!(m.classify(0.0), GridAttribute::Sparse);
        assert_eq!(m.classify(0.4), GridAttribute::Sparse, "D == dl is sparse");
        assert_eq!(m.classify(0.41), GridAttribute::Transitional);
        assert_eq!(m.classify(1.499), GridAttribute::Transitional);
        assert_eq!(m.classify(1.5), GridAttribute::Dense, "D == dm is dense");
    }

    #[test]
    fn test_decay() {
        let m = model(0.5, 3.0, 0.8, None);
        assert!((m.decay(1.0, 3) - 0.125).abs() < 1e-12);
        assert!((m.decay(2.0, 0) - 2.0).abs() < 1e-12, "zero elapsed is a no-op");
    }

    #[test]
    fn test_gap_derivation_uses_smaller_branch() {
        // λ = 0.998: log_λ(0.8/3) ≈ 660.2, log_λ(13/15.2) ≈ 78.1
        let mut m = model(0.998, 3.0, 0.8, None);
        m.recalibrate(16);
        assert_eq!(m.gap(), 78);
    }

    #[test]
    fn test_gap_derivation_ignores_undefined_branch() {
        // N = 1 makes (N - Cm) negative; only the first branch counts.
        let mut m = model(0.998, 3.0, 0.8, None);
        m.recalibrate(1);
        assert_eq!(m.gap(), 660);
    }

    #[test]
    fn test_gap_clamped_to_one() {
        // λ = 0.5, N = 6: second branch ≈ 0.79, floors to 0, clamped.
        let mut m = model(0.5, 3.0, 0.8, None);
        m.recalibrate(6);
        assert_eq!(m.gap(), 1);
    }

    #[test]
    fn test_pinned_gap_survives_recalibration() {
        let mut m = model(0.998, 3.0, 0.8, Some(50));
        m.recalibrate(16);
        assert_eq!(m.gap(), 50);
        m.recalibrate(1000);
        assert_eq!(m.gap(), 50);
    }

    #[test]
    fn test_pi_grows_with_staleness() {
        let mut m = model(0.998, 3.0, 0.8, None);
        m.recalibrate(8);

        let fresh = m.pi(59, 60);
        let stale = m.pi(4, 60);

        assert!(fresh < stale, "π must be monotone in tc - tg");
        assert!((stale - 5.392).abs() < 1e-2, "π(4, 60) ≈ 5.392, got {stale}");
        assert!(stale < m.dl(), "π approaches dl from below, got {stale} vs {}", m.dl());
    }
}
