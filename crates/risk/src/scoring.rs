//! The five sub-scores blended by [`crate::DynamicRiskManager`].
//!
//! Each score lives in [0, 1] with 0.5 meaning "no information / no
//! adjustment". Missing inputs always yield the neutral score.

use riskdesk_core::{MarketAnalysisContext, MarketRegime, Side, StructureLevel};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

use crate::config::ExcursionThresholds;
use crate::excursion::ExcursionStats;

pub const NEUTRAL: Decimal = dec!(0.5);

pub fn clamp_unit(x: Decimal) -> Decimal {
    x.max(Decimal::ZERO).min(Decimal::ONE)
}

fn agrees(level: Option<&StructureLevel>, side: Side) -> Option<bool> {
    level.and_then(|l| l.bias).map(|bias| bias == side)
}

/// Directional agreement plus regime adjustment.
pub fn trend_score(side: Side, ctx: Option<&MarketAnalysisContext>) -> Decimal {
    let Some(ctx) = ctx else {
        return NEUTRAL;
    };
    let mut score = NEUTRAL;
    match ctx.signal {
        Some(signal) if signal == side => score += dec!(0.3),
        Some(_) => score -= dec!(0.3),
        None => {}
    }
    match ctx.regime {
        Some(MarketRegime::Trending) => score += dec!(0.1),
        Some(MarketRegime::HighVolatility) => score -= dec!(0.1),
        _ => {}
    }
    clamp_unit(score)
}

/// Sentiment in the trade's favour raises the score by 0.2 per unit.
pub fn sentiment_score(side: Side, ctx: Option<&MarketAnalysisContext>) -> Decimal {
    match ctx.and_then(|c| c.sentiment_score) {
        Some(sentiment) => clamp_unit(NEUTRAL + dec!(0.2) * sentiment * side.sign()),
        None => NEUTRAL,
    }
}

/// Order block, FVG and break of structure. A BOS against the trade costs
/// more than a confirming one earns.
pub fn structure_score(side: Side, ctx: Option<&MarketAnalysisContext>) -> Decimal {
    let Some(ctx) = ctx else {
        return NEUTRAL;
    };
    let mut score = NEUTRAL;
    if agrees(ctx.order_block.as_ref(), side) == Some(true) {
        score += dec!(0.2);
    }
    if agrees(ctx.fair_value_gap.as_ref(), side) == Some(true) {
        score += dec!(0.1);
    }
    match agrees(ctx.break_of_structure.as_ref(), side) {
        Some(true) => score += dec!(0.2),
        Some(false) => score -= dec!(0.3),
        None => {}
    }
    clamp_unit(score)
}

/// Current drawdown against historical MAE.
///
/// `floating_pnl` is the basket's signed floating P/L; only a loss counts as
/// drawdown, so a basket in profit sits in the safe zone. `hard_stop` is the
/// basket stop amount.
pub fn excursion_score(
    floating_pnl: Decimal,
    hard_stop: Decimal,
    stats: Option<&ExcursionStats>,
    thresholds: &ExcursionThresholds,
) -> Decimal {
    let Some(stats) = stats else {
        return NEUTRAL;
    };
    if stats.percentile != thresholds.percentile {
        warn!(
            stats = %stats.percentile,
            configured = %thresholds.percentile,
            "Excursion stats taken at a different percentile than configured"
        );
    }
    let drawdown = (-floating_pnl).max(Decimal::ZERO);
    let score = if drawdown >= hard_stop.abs() {
        thresholds.breached_score
    } else if drawdown < stats.mae_percentile {
        thresholds.safe_score
    } else {
        thresholds.danger_score
    };
    clamp_unit(score)
}

/// External confidence; values above 1 are read as percentages.
pub fn confidence_score(confidence: Option<Decimal>) -> Decimal {
    match confidence {
        Some(c) if c > Decimal::ONE => clamp_unit(c / Decimal::ONE_HUNDRED),
        Some(c) => clamp_unit(c),
        None => NEUTRAL,
    }
}
