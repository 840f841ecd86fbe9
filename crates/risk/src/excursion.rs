use riskdesk_core::Trade;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// MAE / MFE summary of closed-trade history. All amounts are magnitudes in
/// account currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcursionStats {
    /// Percentile the `mae_percentile` / `mfe_percentile` fields were taken at.
    pub percentile: Decimal,
    pub mae_percentile: Decimal,
    pub mae_max: Decimal,
    pub mae_mean: Decimal,
    pub mfe_median: Decimal,
    pub mfe_percentile: Decimal,
    pub sample_size: usize,
}

impl ExcursionStats {
    /// Summarize the excursions of `trades`. `None` for an empty history.
    pub fn from_trades(trades: &[Trade], percentile: Decimal) -> Option<Self> {
        if trades.is_empty() {
            return None;
        }

        let mut maes: Vec<Decimal> = trades.iter().map(|t| t.mae.abs()).collect();
        let mut mfes: Vec<Decimal> = trades.iter().map(|t| t.mfe.abs()).collect();
        maes.sort();
        mfes.sort();

        let n = Decimal::from(trades.len());
        Some(Self {
            percentile,
            mae_percentile: nearest_rank(&maes, percentile),
            mae_max: maes.last().copied().unwrap_or_default(),
            mae_mean: maes.iter().sum::<Decimal>() / n,
            mfe_median: nearest_rank(&mfes, dec!(50)),
            mfe_percentile: nearest_rank(&mfes, percentile),
            sample_size: trades.len(),
        })
    }
}

/// Nearest-rank percentile of an ascending, non-empty slice.
pub fn nearest_rank(sorted: &[Decimal], percentile: Decimal) -> Decimal {
    if sorted.is_empty() {
        return Decimal::ZERO;
    }
    let pct = percentile.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED);
    let rank = (pct / Decimal::ONE_HUNDRED * Decimal::from(sorted.len())).ceil();
    let idx = rank.to_usize().unwrap_or(1).max(1) - 1;
    sorted[idx.min(sorted.len() - 1)]
}
