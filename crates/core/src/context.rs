//! Market-analysis context consumed by the dynamic risk manager.
//!
//! The analysis payload comes from an exploratory component with no fixed
//! schema. Parsing is lenient: only known keys are read, unknown keys are
//! ignored, and missing or ill-typed values become `None`.

use crate::models::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Market regime label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    Trending,
    Ranging,
    HighVolatility,
    Unknown,
}

impl MarketRegime {
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "trending" | "trend" | "trending_up" | "trending_down" => MarketRegime::Trending,
            "ranging" | "range" | "sideways" | "consolidation" => MarketRegime::Ranging,
            "high_volatility" | "volatile" | "high_vol" => MarketRegime::HighVolatility,
            _ => MarketRegime::Unknown,
        }
    }
}

/// A structural zone (order block, fair-value gap, break of structure).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructureLevel {
    /// Direction the zone favours, if the analysis stated one.
    pub bias: Option<Side>,
    pub top: Option<Decimal>,
    pub bottom: Option<Decimal>,
}

impl StructureLevel {
    pub fn with_bias(bias: Side) -> Self {
        Self {
            bias: Some(bias),
            ..Default::default()
        }
    }

    /// Accepts either a bare label (`"bullish"`) or an object with a
    /// `direction` / `bias` / `type` key and optional `top` / `bottom`.
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Side::from_label(s).map(Self::with_bias),
            Value::Object(map) => {
                let bias = ["direction", "bias", "type", "signal"]
                    .iter()
                    .find_map(|k| map.get(*k).and_then(Value::as_str))
                    .and_then(Side::from_label);
                let top = ["top", "high", "upper"].iter().find_map(|k| map.get(*k).and_then(decimal_of));
                let bottom = ["bottom", "low", "lower"]
                    .iter()
                    .find_map(|k| map.get(*k).and_then(decimal_of));
                if bias.is_none() && top.is_none() && bottom.is_none() {
                    None
                } else {
                    Some(Self { bias, top, bottom })
                }
            }
            _ => None,
        }
    }
}

/// Loosely structured analysis bag. Every field is optional; absent fields
/// score neutral.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketAnalysisContext {
    pub regime: Option<MarketRegime>,
    /// Directional call of the external analysis.
    pub signal: Option<Side>,
    pub order_block: Option<StructureLevel>,
    pub fair_value_gap: Option<StructureLevel>,
    pub break_of_structure: Option<StructureLevel>,
    /// Roughly -2 (very bearish) .. +2 (very bullish).
    pub sentiment_score: Option<Decimal>,
}

const REGIME_KEYS: &[&str] = &["market_state", "regime", "market_regime"];
const SIGNAL_KEYS: &[&str] = &["signal", "direction", "action", "trend"];
const STRUCTURE_KEYS: &[&str] = &["structure", "smc", "market_structure"];
const ORDER_BLOCK_KEYS: &[&str] = &["order_block", "ob"];
const FVG_KEYS: &[&str] = &["fair_value_gap", "fvg"];
const BOS_KEYS: &[&str] = &["break_of_structure", "bos"];
const SENTIMENT_KEYS: &[&str] = &["sentiment_score", "sentiment"];

impl MarketAnalysisContext {
    /// Read the known keys out of an arbitrary JSON payload.
    ///
    /// Structural keys are looked up both at the top level and inside a
    /// nested `structure` / `smc` object; the nested value wins.
    pub fn from_json(value: &Value) -> Self {
        let Some(root) = value.as_object() else {
            return Self::default();
        };

        let lookup = |keys: &[&str]| keys.iter().find_map(|k| root.get(*k));

        let regime = lookup(REGIME_KEYS)
            .and_then(Value::as_str)
            .map(MarketRegime::from_label);

        let signal = lookup(SIGNAL_KEYS).and_then(Value::as_str).and_then(Side::from_label);

        let nested = STRUCTURE_KEYS
            .iter()
            .find_map(|k| root.get(*k))
            .and_then(Value::as_object);
        let structure = |keys: &[&str]| {
            nested
                .and_then(|m| keys.iter().find_map(|k| m.get(*k)))
                .or_else(|| lookup(keys))
                .and_then(StructureLevel::from_value)
        };

        let sentiment_score = lookup(SENTIMENT_KEYS).and_then(|v| match v {
            Value::Object(m) => m.get("score").and_then(decimal_of),
            other => decimal_of(other),
        });

        Self {
            regime,
            signal,
            order_block: structure(ORDER_BLOCK_KEYS),
            fair_value_gap: structure(FVG_KEYS),
            break_of_structure: structure(BOS_KEYS),
            sentiment_score,
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(s)?;
        Ok(Self::from_json(&value))
    }
}

/// Numbers and numeric strings both count.
fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(|f| Decimal::try_from(f).ok())
            }
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parses_nested_structure() {
        let ctx = MarketAnalysisContext::from_json(&json!({
            "market_state": "Trending",
            "signal": "buy",
            "smc": {
                "order_block": {"type": "bullish", "top": 1.1010, "bottom": 1.0990},
                "fvg": "bearish",
                "bos": {"direction": "bullish"}
            },
            "sentiment_score": 1.5,
            "unrelated": [1, 2, 3]
        }));

        assert_eq!(ctx.regime, Some(MarketRegime::Trending));
        assert_eq!(ctx.signal, Some(Side::Buy));
        let ob = ctx.order_block.unwrap();
        assert_eq!(ob.bias, Some(Side::Buy));
        assert_eq!(ob.bottom, Some(dec!(1.099)));
        assert_eq!(ctx.fair_value_gap.unwrap().bias, Some(Side::Sell));
        assert_eq!(ctx.break_of_structure.unwrap().bias, Some(Side::Buy));
        assert_eq!(ctx.sentiment_score, Some(dec!(1.5)));
    }

    #[test]
    fn test_missing_and_ill_typed_keys_are_none() {
        let ctx = MarketAnalysisContext::from_json(&json!({
            "signal": 42,
            "sentiment": "not a number",
            "regime": "high volatility"
        }));
        assert_eq!(ctx.signal, None);
        assert_eq!(ctx.sentiment_score, None);
        assert_eq!(ctx.order_block, None);
        assert_eq!(ctx.regime, Some(MarketRegime::HighVolatility));
    }

    #[test]
    fn test_non_object_payload_is_empty_context() {
        assert_eq!(
            MarketAnalysisContext::from_json(&json!([1, 2])),
            MarketAnalysisContext::default()
        );
    }

    #[test]
    fn test_sentiment_as_string_and_object() {
        let a = MarketAnalysisContext::from_json(&json!({"sentiment": "-0.5"}));
        assert_eq!(a.sentiment_score, Some(dec!(-0.5)));
        let b = MarketAnalysisContext::from_json(&json!({"sentiment": {"score": 2}}));
        assert_eq!(b.sentiment_score, Some(dec!(2)));
    }
}
