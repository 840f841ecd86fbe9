use riskdesk_core::{MarketAnalysisContext, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ExcursionThresholds, RiskConfig, RiskWeights};
use crate::excursion::ExcursionStats;
use crate::scoring;

/// Returned in place of an adjusted stop when the base amount is unusable.
pub const DEFAULT_SL_AMOUNT: Decimal = dec!(-100.0);
/// Multiplier at an aggregate score of 0.
pub const MULTIPLIER_FLOOR: Decimal = dec!(0.5);
/// Multiplier gained between an aggregate score of 0 and 1.
pub const MULTIPLIER_SPAN: Decimal = dec!(0.7);
/// The adjusted stop never tightens below this fraction of the base.
pub const MIN_SL_FRACTION: Decimal = dec!(0.3);

/// Per-call detail of how the stop was adjusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlBreakdown {
    pub trend_score: Decimal,
    pub sentiment_score: Decimal,
    pub structure_score: Decimal,
    pub excursion_score: Decimal,
    pub confidence_score: Decimal,
    pub total_score: Decimal,
    pub multiplier: Decimal,
    /// Raised when the aggregate score is low enough that the factors
    /// disagree and the basket needs a human look.
    pub conflict_alert: bool,
    pub error: Option<String>,
}

impl SlBreakdown {
    fn invalid(reason: String) -> Self {
        Self {
            trend_score: Decimal::ZERO,
            sentiment_score: Decimal::ZERO,
            structure_score: Decimal::ZERO,
            excursion_score: Decimal::ZERO,
            confidence_score: Decimal::ZERO,
            total_score: Decimal::ZERO,
            multiplier: Decimal::ZERO,
            conflict_alert: false,
            error: Some(reason),
        }
    }
}

/// Context-aware basket stop-loss and tiered take-profit calculator.
///
/// Stateless after construction; safe to share across threads.
#[derive(Debug, Clone)]
pub struct DynamicRiskManager {
    weights: RiskWeights,
    thresholds: ExcursionThresholds,
    conflict_threshold: Decimal,
}

impl Default for DynamicRiskManager {
    fn default() -> Self {
        Self::new(&RiskConfig::default())
    }
}

impl DynamicRiskManager {
    pub fn new(config: &RiskConfig) -> Self {
        Self::with_weights(config.weights, config.excursion, config.conflict_threshold)
    }

    /// Weights that do not sum to 1.0 are rescaled so the aggregate score
    /// stays in [0, 1].
    pub fn with_weights(
        weights: RiskWeights,
        thresholds: ExcursionThresholds,
        conflict_threshold: Decimal,
    ) -> Self {
        let normalized = weights.normalized();
        if normalized != weights {
            warn!(
                sum = %weights.sum(),
                "Risk weights do not sum to 1.0; rescaled"
            );
        }
        Self {
            weights: normalized,
            thresholds,
            conflict_threshold,
        }
    }

    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    /// Map an aggregate score in [0, 1] to a stop multiplier in [0.5, 1.2].
    pub fn score_to_multiplier(total_score: Decimal) -> Decimal {
        MULTIPLIER_FLOOR + scoring::clamp_unit(total_score) * MULTIPLIER_SPAN
    }

    /// Adjust a symmetric basket stop to the current context.
    ///
    /// Returns the adjusted stop as a negative amount (loss limit) and the
    /// score breakdown. `floating_pnl` is the basket's signed floating P/L
    /// (negative while losing, as from [`crate::aggregate_pnl`]);
    /// `confidence` is the external prediction confidence, either in [0, 1]
    /// or as a percentage. A stop too large to scale comes back as the
    /// default amount with an error tag.
    pub fn calculate_dynamic_basket_sl(
        &self,
        base_sl_amount: Decimal,
        side: Side,
        context: Option<&MarketAnalysisContext>,
        excursion: Option<&ExcursionStats>,
        floating_pnl: Decimal,
        confidence: Option<Decimal>,
    ) -> (Decimal, SlBreakdown) {
        if base_sl_amount <= Decimal::ZERO {
            warn!(%base_sl_amount, "Non-positive base SL amount, using default");
            return (
                DEFAULT_SL_AMOUNT,
                SlBreakdown::invalid(format!("invalid base SL amount: {}", base_sl_amount)),
            );
        }

        let trend = scoring::trend_score(side, context);
        let sentiment = scoring::sentiment_score(side, context);
        let structure = scoring::structure_score(side, context);
        let excursion_score =
            scoring::excursion_score(floating_pnl, base_sl_amount, excursion, &self.thresholds);
        let confidence_score = scoring::confidence_score(confidence);

        let w = &self.weights;
        let total = scoring::clamp_unit(
            trend * w.trend
                + sentiment * w.sentiment
                + structure * w.structure
                + excursion_score * w.excursion
                + confidence_score * w.confidence,
        );
        let multiplier = Self::score_to_multiplier(total);

        let scaled = base_sl_amount
            .checked_mul(multiplier)
            .zip(base_sl_amount.checked_mul(MIN_SL_FRACTION));
        let Some((scaled, floor)) = scaled else {
            warn!(%base_sl_amount, %multiplier, "Basket SL overflowed, using default");
            return (
                DEFAULT_SL_AMOUNT,
                SlBreakdown::invalid("arithmetic overflow".to_string()),
            );
        };
        let adjusted = scaled.max(floor);
        let conflict_alert = total < self.conflict_threshold;

        debug!(
            %trend, %sentiment, %structure,
            excursion = %excursion_score,
            confidence = %confidence_score,
            "Basket SL sub-scores"
        );
        if conflict_alert {
            warn!(
                %side, total_score = %total,
                threshold = %self.conflict_threshold,
                "Risk factors conflict; basket needs manual review"
            );
        }
        info!(
            %side, base = %base_sl_amount, %multiplier, adjusted = %adjusted,
            "Dynamic basket SL computed"
        );

        (
            -adjusted,
            SlBreakdown {
                trend_score: trend,
                sentiment_score: sentiment,
                structure_score: structure,
                excursion_score,
                confidence_score,
                total_score: total,
                multiplier,
                conflict_alert,
                error: None,
            },
        )
    }

    /// Take-profit target for ladder tier `level` (0 = the base target).
    pub fn calculate_tiered_tp(
        &self,
        base_tp_amount: Decimal,
        volatility: Decimal,
        volatility_factor: Decimal,
        level: u32,
    ) -> Decimal {
        tiered_tp(base_tp_amount, volatility, volatility_factor, level)
    }
}

/// `base + volatility × 0.5 × level × factor`, saturating at the decimal
/// range instead of overflowing.
pub fn tiered_tp(
    base_tp_amount: Decimal,
    volatility: Decimal,
    volatility_factor: Decimal,
    level: u32,
) -> Decimal {
    volatility
        .saturating_mul(dec!(0.5))
        .saturating_mul(Decimal::from(level))
        .saturating_mul(volatility_factor)
        .saturating_add(base_tp_amount)
}
