//! Engine configuration.
//!
//! All parameters of the D-Stream algorithm live here: the decay factor λ,
//! the dense/sparse threshold controls `Cm` and `Cl`, the sporadic-grid
//! protection window β, and the optional pinned time gap. Out-of-range
//! values are rejected before the engine starts consuming records.

use crate::error::{Result, StreamError};
use serde::{Deserialize, Serialize};

/// Configuration for a [`DStream`](crate::DStream) engine.
///
/// The defaults match the reference parameterization of the algorithm
/// (λ = 0.998, Cm = 3.0, Cl = 0.8, β = 0.3, derived gap).
///
/// # Example
///
/// ```rust
/// use gridstream::StreamConfig;
///
/// let config = StreamConfig {
///     decay_factor: 0.5,
///     time_gap: Some(10),
///     ..StreamConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Decay factor λ, in (0.001, 0.999). Densities age as λ per tick.
    pub decay_factor: f64,

    /// Controls the threshold for dense grids, > 1.001.
    pub cm: f64,

    /// Controls the threshold for sparse grids, in (0.001, 0.999).
    pub cl: f64,

    /// Window of protection against re-flagging previously deleted grids
    /// as sporadic, > 0.001.
    pub beta: f64,

    /// Ticks between clustering cycles. When `None`, the gap is derived
    /// from λ, Cm, Cl and the current grid-space size.
    pub time_gap: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            decay_factor: 0.998,
            cm: 3.0,
            cl: 0.8,
            beta: 0.3,
            time_gap: None,
        }
    }
}

impl StreamConfig {
    /// Check every parameter against its admissible range.
    ///
    /// Returns the first violation found, so the engine can fail fast
    /// before consuming any records.
    pub fn validate(&self) -> Result<()> {
        if self.decay_factor <= 0.001 || self.decay_factor >= 0.999 {
            return Err(StreamError::InvalidParameter {
                name: "decay_factor",
                value: self.decay_factor,
                expected: "a value in (0.001, 0.999)",
            });
        }
        if self.cm <= 1.001 {
            return Err(StreamError::InvalidParameter {
                name: "cm",
                value: self.cm,
                expected: "a value > 1.001",
            });
        }
        if self.cl <= 0.001 || self.cl >= 0.999 {
            return Err(StreamError::InvalidParameter {
                name: "cl",
                value: self.cl,
                expected: "a value in (0.001, 0.999)",
            });
        }
        if self.beta <= 0.001 {
            return Err(StreamError::InvalidParameter {
                name: "beta",
                value: self.beta,
                expected: "a value > 0.001",
            });
        }
        if let Some(gap) = self.time_gap {
            if gap < 1 {
                return Err(StreamError::InvalidParameter {
                    name: "time_gap",
                    value: gap as f64,
                    expected: "an integer >= 1",
                });
            }
        }
        Ok(())
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a configuration from JSON.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(StreamConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_decay() {
        let config = StreamConfig {
            decay_factor: 1.5,
            ..StreamConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StreamError::InvalidParameter { name: "decay_factor", .. })
        ));
    }

    #[test]
    fn test_rejects_small_cm() {
        let config = StreamConfig {
            cm: 1.0,
            ..StreamConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StreamError::InvalidParameter { name: "cm", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_gap() {
        let config = StreamConfig {
            time_gap: Some(0),
            ..StreamConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StreamError::InvalidParameter { name: "time_gap", .. })
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = StreamConfig {
            decay_factor: 0.5,
            cm: 2.0,
            cl: 0.4,
            beta: 1.0,
            time_gap: Some(25),
        };

        let json = config.to_json().expect("serialize failed");
        let parsed = StreamConfig::from_json(&json).expect("parse failed");

        assert_eq!(parsed.decay_factor, config.decay_factor);
        assert_eq!(parsed.cm, config.cm);
        assert_eq!(parsed.cl, config.cl);
        assert_eq!(parsed.beta, config.beta);
        assert_eq!(parsed.time_gap, config.time_gap);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let parsed = StreamConfig::from_json(r#"{"decay_factor": 0.9}"#).expect("parse failed");
        assert_eq!(parsed.decay_factor, 0.9);
        assert_eq!(parsed.cm, 3.0);
        assert_eq!(parsed.time_gap, None);
    }

    #[test]
    fn test_from_json_validates() {
        let result = StreamConfig::from_json(r#"{"cl": 7.0}"#);
        assert!(result.is_err(), "out-of-range cl should fail validation");
    }
}
