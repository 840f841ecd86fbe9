use riskdesk_core::Position;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::BasketConfig;
use crate::dynamic::tiered_tp;

/// ATR-derived base stop for a basket, in account currency.
///
/// `atr` is in price units; `rate` converts quote to account currency.
/// Saturates at the decimal range.
pub fn volatility_base_sl(
    atr: Decimal,
    total_volume: Decimal,
    contract_size: Decimal,
    atr_multiplier: Decimal,
    rate: Decimal,
) -> Decimal {
    atr.abs()
        .saturating_mul(atr_multiplier.abs())
        .saturating_mul(total_volume.abs())
        .saturating_mul(contract_size.abs())
        .saturating_mul(rate.abs())
}

/// Sum of floating P/L across the basket.
pub fn aggregate_pnl(positions: &[Position]) -> Decimal {
    positions.iter().map(|p| p.unrealized_pnl).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    StopLoss,
    TakeProfit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BasketAction {
    Hold,
    /// Close every position in the basket.
    CloseAll { reason: CloseReason, pnl: Decimal },
    /// A tier was reached; the target moved out and the previous target
    /// became the profit floor.
    ExtendTarget {
        tier: u32,
        next_target: Decimal,
        locked_floor: Option<Decimal>,
    },
}

/// Tracks one basket against its adjusted stop and take-profit ladder.
#[derive(Debug, Clone)]
pub struct BasketMonitor {
    /// Loss limit, negative.
    sl_amount: Decimal,
    base_tp: Decimal,
    volatility: Decimal,
    volatility_factor: Decimal,
    max_tiers: u32,
    lock_previous_tier: bool,
    /// Tiers reached so far.
    tier: u32,
}

impl BasketMonitor {
    /// `sl_amount` is the adjusted (negative) stop from the dynamic risk
    /// manager; a positive value is treated as its magnitude.
    pub fn new(sl_amount: Decimal, base_tp: Decimal, volatility: Decimal, config: &BasketConfig) -> Self {
        Self {
            sl_amount: -sl_amount.abs(),
            base_tp: base_tp.abs(),
            volatility: volatility.abs(),
            volatility_factor: config.volatility_factor,
            max_tiers: config.max_tiers.max(1),
            lock_previous_tier: config.lock_previous_tier,
            tier: 0,
        }
    }

    pub fn tier(&self) -> u32 {
        self.tier
    }

    pub fn sl_amount(&self) -> Decimal {
        self.sl_amount
    }

    /// Target for the tier currently being worked.
    pub fn current_target(&self) -> Decimal {
        self.target_for(self.tier)
    }

    pub fn target_for(&self, level: u32) -> Decimal {
        tiered_tp(self.base_tp, self.volatility, self.volatility_factor, level)
    }

    /// Refresh the volatility measure; later targets move with it.
    pub fn set_volatility(&mut self, volatility: Decimal) {
        self.volatility = volatility.abs();
    }

    /// Profit floor locked by the last tier reached, if any.
    pub fn locked_floor(&self) -> Option<Decimal> {
        if self.lock_previous_tier && self.tier > 0 {
            Some(self.target_for(self.tier - 1))
        } else {
            None
        }
    }

    /// [`Self::evaluate`] on the summed floating P/L of the legs.
    pub fn evaluate_positions(&mut self, positions: &[Position]) -> BasketAction {
        self.evaluate(aggregate_pnl(positions))
    }

    /// Decide what to do with the basket at aggregate P/L `pnl`.
    pub fn evaluate(&mut self, pnl: Decimal) -> BasketAction {
        if pnl <= self.sl_amount {
            info!(%pnl, sl = %self.sl_amount, "Basket stop-loss hit");
            return BasketAction::CloseAll {
                reason: CloseReason::StopLoss,
                pnl,
            };
        }

        if let Some(floor) = self.locked_floor() {
            if pnl < floor {
                info!(%pnl, %floor, tier = self.tier, "Basket fell back to locked tier");
                return BasketAction::CloseAll {
                    reason: CloseReason::TakeProfit,
                    pnl,
                };
            }
        }

        let target = self.current_target();
        if pnl < target {
            return BasketAction::Hold;
        }

        self.tier += 1;
        if self.tier >= self.max_tiers {
            info!(%pnl, %target, tier = self.tier, "Final take-profit tier reached");
            return BasketAction::CloseAll {
                reason: CloseReason::TakeProfit,
                pnl,
            };
        }

        let next_target = self.current_target();
        info!(%pnl, tier = self.tier, %next_target, "Take-profit tier reached, extending target");
        BasketAction::ExtendTarget {
            tier: self.tier,
            next_target,
            locked_floor: self.locked_floor(),
        }
    }
}
