use riskdesk_fx::FxConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors loading or validating a [`RiskConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Relative weight of each sub-score in the aggregate basket score.
/// Expected to sum to 1.0; see [`RiskWeights::normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub trend: Decimal,
    pub sentiment: Decimal,
    pub structure: Decimal,
    pub excursion: Decimal,
    pub confidence: Decimal,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self::balanced()
    }
}

impl RiskWeights {
    /// Default blend.
    pub fn balanced() -> Self {
        Self {
            trend: dec!(0.30),
            sentiment: dec!(0.20),
            structure: dec!(0.25),
            excursion: dec!(0.10),
            confidence: dec!(0.15),
        }
    }

    /// Leans on the directional call and regime.
    pub fn trend_following() -> Self {
        Self {
            trend: dec!(0.40),
            sentiment: dec!(0.15),
            structure: dec!(0.20),
            excursion: dec!(0.10),
            confidence: dec!(0.15),
        }
    }

    /// Leans on order blocks / FVG / BOS and excursion history.
    pub fn structure_first() -> Self {
        Self {
            trend: dec!(0.20),
            sentiment: dec!(0.10),
            structure: dec!(0.40),
            excursion: dec!(0.20),
            confidence: dec!(0.10),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "balanced" | "default" => Some(Self::balanced()),
            "trend_following" => Some(Self::trend_following()),
            "structure_first" => Some(Self::structure_first()),
            _ => None,
        }
    }

    pub fn sum(&self) -> Decimal {
        self.trend + self.sentiment + self.structure + self.excursion + self.confidence
    }

    /// Negative weights clamp to zero, then everything is rescaled to sum to
    /// 1.0. All-zero weights fall back to [`RiskWeights::balanced`].
    pub fn normalized(&self) -> Self {
        let clamp = |w: Decimal| w.max(Decimal::ZERO);
        let clamped = Self {
            trend: clamp(self.trend),
            sentiment: clamp(self.sentiment),
            structure: clamp(self.structure),
            excursion: clamp(self.excursion),
            confidence: clamp(self.confidence),
        };
        let total = clamped.sum();
        if total.is_zero() {
            return Self::balanced();
        }
        if total == Decimal::ONE {
            return clamped;
        }
        Self {
            trend: clamped.trend / total,
            sentiment: clamped.sentiment / total,
            structure: clamped.structure / total,
            excursion: clamped.excursion / total,
            confidence: clamped.confidence / total,
        }
    }
}

// ---------------------------------------------------------------------------
// Excursion thresholds
// ---------------------------------------------------------------------------

/// How the historical-excursion sub-score maps the current drawdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcursionThresholds {
    /// MAE percentile that bounds the "normal" zone.
    pub percentile: Decimal,
    /// Drawdown still inside historical norms.
    pub safe_score: Decimal,
    /// Drawdown past the percentile but short of the hard stop.
    pub danger_score: Decimal,
    /// Drawdown at or past the hard stop.
    pub breached_score: Decimal,
}

impl Default for ExcursionThresholds {
    fn default() -> Self {
        Self {
            percentile: dec!(95),
            safe_score: dec!(0.8),
            danger_score: dec!(0.2),
            breached_score: Decimal::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Basket
// ---------------------------------------------------------------------------

/// Basket stop / take-profit ladder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasketConfig {
    /// ATR lookback used for the volatility measure.
    pub atr_period: usize,
    /// Base stop = ATR × multiplier × volume × contract size.
    pub atr_multiplier: Decimal,
    /// Scales how far each take-profit tier extends.
    pub volatility_factor: Decimal,
    /// Number of take-profit tiers before the basket is closed outright.
    pub max_tiers: u32,
    /// Once a tier is reached, close if profit falls back below it.
    pub lock_previous_tier: bool,
}

impl Default for BasketConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            atr_multiplier: dec!(1.5),
            volatility_factor: Decimal::ONE,
            max_tiers: 3,
            lock_previous_tier: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

/// Root configuration, loadable from TOML. Every section is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub weights: RiskWeights,
    pub excursion: ExcursionThresholds,
    /// Aggregate score below which the breakdown raises a conflict alert.
    pub conflict_threshold: Decimal,
    pub basket: BasketConfig,
    pub fx: FxConfig,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            excursion: ExcursionThresholds::default(),
            conflict_threshold: dec!(0.4),
            basket: BasketConfig::default(),
            fx: FxConfig::default(),
        }
    }
}

impl RiskConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: RiskConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        for (field, value) in [
            ("weights.trend", w.trend),
            ("weights.sentiment", w.sentiment),
            ("weights.structure", w.structure),
            ("weights.excursion", w.excursion),
            ("weights.confidence", w.confidence),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("weight must be non-negative, got {}", value),
                });
            }
        }
        if w.sum().is_zero() {
            return Err(ConfigError::Invalid {
                field: "weights",
                reason: "at least one weight must be positive".to_string(),
            });
        }

        let e = &self.excursion;
        if e.percentile <= Decimal::ZERO || e.percentile > Decimal::ONE_HUNDRED {
            return Err(ConfigError::Invalid {
                field: "excursion.percentile",
                reason: format!("must be in (0, 100], got {}", e.percentile),
            });
        }
        for (field, value) in [
            ("excursion.safe_score", e.safe_score),
            ("excursion.danger_score", e.danger_score),
            ("excursion.breached_score", e.breached_score),
            ("conflict_threshold", self.conflict_threshold),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be in [0, 1], got {}", value),
                });
            }
        }

        if self.basket.atr_period == 0 {
            return Err(ConfigError::Invalid {
                field: "basket.atr_period",
                reason: "must be > 0".to_string(),
            });
        }
        if self.basket.atr_multiplier <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                field: "basket.atr_multiplier",
                reason: format!("must be positive, got {}", self.basket.atr_multiplier),
            });
        }
        if self.basket.max_tiers == 0 {
            return Err(ConfigError::Invalid {
                field: "basket.max_tiers",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_sum_to_one() {
        for name in ["balanced", "trend_following", "structure_first"] {
            let w = RiskWeights::by_name(name).unwrap();
            assert_eq!(w.sum(), Decimal::ONE, "{name}");
        }
        assert!(RiskWeights::by_name("yolo").is_none());
    }

    #[test]
    fn test_normalized_rescales() {
        let w = RiskWeights {
            trend: dec!(3),
            sentiment: dec!(2),
            structure: dec!(2.5),
            excursion: dec!(1),
            confidence: dec!(1.5),
        };
        assert_eq!(w.normalized(), RiskWeights::balanced());
    }

    #[test]
    fn test_normalized_clamps_negative_and_zero() {
        let w = RiskWeights {
            trend: dec!(-1),
            sentiment: Decimal::ZERO,
            structure: dec!(0.5),
            excursion: Decimal::ZERO,
            confidence: dec!(0.5),
        };
        let n = w.normalized();
        assert_eq!(n.trend, Decimal::ZERO);
        assert_eq!(n.sum(), Decimal::ONE);

        let zero = RiskWeights {
            trend: Decimal::ZERO,
            sentiment: Decimal::ZERO,
            structure: Decimal::ZERO,
            excursion: Decimal::ZERO,
            confidence: Decimal::ZERO,
        };
        assert_eq!(zero.normalized(), RiskWeights::balanced());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RiskConfig::from_toml_str(
            r#"
            conflict_threshold = 0.35

            [weights]
            trend = 0.5

            [fx]
            cache_ttl_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.conflict_threshold, dec!(0.35));
        assert_eq!(config.weights.trend, dec!(0.5));
        assert_eq!(config.weights.sentiment, dec!(0.20));
        assert_eq!(config.fx.cache_ttl_secs, 60);
        assert_eq!(config.basket, BasketConfig::default());
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = RiskConfig::default().to_toml_string().unwrap();
        let parsed = RiskConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, RiskConfig::default());
    }

    #[test]
    fn test_rejects_bad_percentile() {
        let err = RiskConfig::from_toml_str("[excursion]\npercentile = 150").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "excursion.percentile",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let err = RiskConfig::from_toml_str("[weights]\nsentiment = -0.1").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "weights.sentiment", .. }));
    }
}
