use riskdesk_core::{CalculationResult, ExchangeRateService, RiskLevel, TradeSignal};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Converts a [`TradeSignal`] into the largest position consistent with the
/// risk budget, the available margin, and the drawdown circuit breaker.
///
/// Every expected failure comes back as a `BLOCKED` result; `calculate`
/// never panics on valid signals.
pub struct PositionSizer<R> {
    rates: R,
}

impl<R: ExchangeRateService> PositionSizer<R> {
    pub fn new(rates: R) -> Self {
        Self { rates }
    }

    pub fn calculate(&self, signal: &TradeSignal) -> CalculationResult {
        // Circuit breaker first, every time.
        if signal.current_drawdown_percent >= signal.max_drawdown_percent {
            let msg = format!(
                "BLOCKED: MAX DRAWDOWN reached ({}% >= {}%)",
                signal.current_drawdown_percent, signal.max_drawdown_percent
            );
            warn!(
                current = %signal.current_drawdown_percent,
                max = %signal.max_drawdown_percent,
                "Position sizing blocked by drawdown circuit breaker"
            );
            return CalculationResult::blocked(msg);
        }

        let rate = match self.resolve_rate(signal) {
            Ok(rate) => rate,
            Err(msg) => {
                warn!(
                    quote = %signal.quote_currency,
                    account = %signal.account_currency,
                    "{}", msg
                );
                return CalculationResult::blocked(msg);
            }
        };

        match size_with_rate(signal, rate) {
            Some(result) => {
                info!(
                    asset_class = %signal.asset_class,
                    size = %result.suggested_position_size,
                    risk = %result.risk_amount_account,
                    margin = %result.required_margin_account,
                    level = %result.risk_level,
                    "Position size calculated"
                );
                result
            }
            None => {
                warn!("Position sizing overflowed; inputs out of range");
                CalculationResult::blocked("BLOCKED: arithmetic overflow")
            }
        }
    }

    fn resolve_rate(&self, signal: &TradeSignal) -> Result<Decimal, String> {
        let rate = match signal.exchange_rate {
            Some(manual) => manual,
            None => self
                .rates
                .get_realtime_rate(&signal.quote_currency, &signal.account_currency)
                .map_err(|e| {
                    format!(
                        "BLOCKED: exchange rate {}/{} unavailable: {}",
                        signal.quote_currency, signal.account_currency, e
                    )
                })?,
        };
        if rate <= Decimal::ZERO {
            return Err(format!("BLOCKED: invalid exchange rate {}", rate));
        }
        Ok(rate)
    }
}

/// Budget, margin cap and rounding once the rate is known. `None` only on
/// decimal overflow.
fn size_with_rate(signal: &TradeSignal, rate: Decimal) -> Option<CalculationResult> {
    let risk_budget = signal
        .total_capital
        .checked_mul(signal.risk_percent)?
        .checked_div(Decimal::ONE_HUNDRED)?;

    let unit_notional_quote = signal.entry_price.checked_mul(signal.contract_size)?;
    let unit_notional_account = unit_notional_quote.checked_mul(rate)?;
    let per_unit_risk = signal
        .stop_distance()
        .checked_mul(signal.contract_size)?
        .checked_mul(rate)?;

    if per_unit_risk.is_zero() {
        return Some(CalculationResult::blocked("BLOCKED: Invalid SL Distance"));
    }

    let raw_size = risk_budget.checked_div(per_unit_risk)?;
    let raw_margin = raw_size
        .checked_mul(unit_notional_account)?
        .checked_div(signal.leverage)?;

    let (size, risk_level, mut msg) = if raw_margin > signal.total_capital {
        let max_size = signal
            .total_capital
            .checked_mul(signal.leverage)?
            .checked_div(unit_notional_account)?;
        (
            max_size,
            RiskLevel::High,
            format!(
                "Margin constrained: size reduced from {} to {}",
                signal.asset_class.round_size(raw_size),
                signal.asset_class.round_size(max_size)
            ),
        )
    } else {
        (raw_size, RiskLevel::Normal, "Success".to_string())
    };

    let rounded = signal.asset_class.round_size(size);
    if rounded.is_zero() {
        msg = format!(
            "Position size below minimum {} increment",
            signal.asset_class
        );
    }

    let position_value_quote = rounded.checked_mul(unit_notional_quote)?;
    Some(CalculationResult {
        suggested_position_size: rounded,
        position_value_quote,
        risk_amount_account: rounded.checked_mul(per_unit_risk)?,
        required_margin_account: position_value_quote
            .checked_mul(rate)?
            .checked_div(signal.leverage)?,
        exchange_rate_used: rate,
        risk_level,
        execution_msg: msg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskdesk_core::AssetClass;
    use riskdesk_fx::FixedRates;
    use rust_decimal_macros::dec;

    fn sizer() -> PositionSizer<FixedRates> {
        PositionSizer::new(FixedRates::new().with_rate("JPY", "USD", dec!(0.0064)))
    }

    fn eurusd() -> TradeSignal {
        TradeSignal::builder(dec!(10000), dec!(1.0), dec!(1.1000), dec!(1.0900))
            .asset_class(AssetClass::Forex)
            .contract_size(dec!(100000))
            .leverage(dec!(100))
            .drawdown(dec!(0), dec!(20))
            .exchange_rate(dec!(1.0))
            .build()
            .unwrap()
    }

    #[test]
    fn test_eurusd_one_percent() {
        let result = sizer().calculate(&eurusd());
        assert_eq!(result.suggested_position_size, dec!(0.10));
        assert_eq!(result.risk_amount_account, dec!(100.00));
        assert_eq!(result.position_value_quote, dec!(11000));
        assert_eq!(result.required_margin_account, dec!(110));
        assert_eq!(result.exchange_rate_used, dec!(1.0));
        assert_eq!(result.risk_level, RiskLevel::Normal);
        assert_eq!(result.execution_msg, "Success");
    }

    #[test]
    fn test_gold_two_percent() {
        let signal = TradeSignal::builder(dec!(5000), dec!(2.0), dec!(2000.00), dec!(1990.00))
            .asset_class(AssetClass::Forex)
            .contract_size(dec!(100))
            .leverage(dec!(100))
            .exchange_rate(dec!(1.0))
            .build()
            .unwrap();
        let result = sizer().calculate(&signal);
        assert_eq!(result.suggested_position_size, dec!(0.10));
        assert_eq!(result.risk_level, RiskLevel::Normal);
    }

    #[test]
    fn test_drawdown_breach_blocks() {
        let mut signal = eurusd();
        signal.current_drawdown_percent = dec!(25);
        signal.max_drawdown_percent = dec!(20);
        let result = sizer().calculate(&signal);
        assert_eq!(result.risk_level, RiskLevel::Blocked);
        assert_eq!(result.suggested_position_size, Decimal::ZERO);
        assert!(result.execution_msg.contains("MAX DRAWDOWN"));

        // Exactly at the limit also blocks.
        signal.current_drawdown_percent = dec!(20);
        assert!(sizer().calculate(&signal).is_blocked());
    }

    #[test]
    fn test_missing_rate_blocks_with_error_text() {
        let signal = TradeSignal::builder(dec!(10000), dec!(1), dec!(0.8600), dec!(0.8550))
            .currencies("USD", "GBP")
            .contract_size(dec!(100000))
            .leverage(dec!(100))
            .build()
            .unwrap();
        let result = sizer().calculate(&signal);
        assert!(result.is_blocked());
        assert!(result.execution_msg.contains("GBP/USD"));
        assert!(result.execution_msg.contains("not available"));
        assert_eq!(result.exchange_rate_used, Decimal::ZERO);
        assert_eq!(result.risk_amount_account, Decimal::ZERO);
    }

    #[test]
    fn test_live_rate_used_for_cross_currency() {
        let signal = TradeSignal::builder(dec!(10000), dec!(1), dec!(150.00), dec!(149.00))
            .currencies("USD", "JPY")
            .contract_size(dec!(100000))
            .leverage(dec!(100))
            .build()
            .unwrap();
        let result = sizer().calculate(&signal);
        // per lot: 1.00 * 100000 * 0.0064 = 640 USD -> 100 / 640 = 0.156
        assert_eq!(result.exchange_rate_used, dec!(0.0064));
        assert_eq!(result.suggested_position_size, dec!(0.15));
        assert_eq!(result.risk_amount_account, dec!(96));
    }

    #[test]
    fn test_manual_rate_skips_lookup() {
        let signal = TradeSignal::builder(dec!(10000), dec!(1), dec!(0.8600), dec!(0.8500))
            .currencies("USD", "GBP")
            .contract_size(dec!(100000))
            .leverage(dec!(100))
            .exchange_rate(dec!(1.25))
            .build()
            .unwrap();
        let result = sizer().calculate(&signal);
        assert!(!result.is_blocked());
        assert_eq!(result.exchange_rate_used, dec!(1.25));
        assert_eq!(result.suggested_position_size, dec!(0.08));
    }

    #[test]
    fn test_margin_constraint_downgrades_to_high() {
        let signal = TradeSignal::builder(dec!(1000), dec!(10), dec!(100), dec!(99))
            .asset_class(AssetClass::Stock)
            .build()
            .unwrap();
        let result = sizer().calculate(&signal);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.suggested_position_size, dec!(10));
        assert_eq!(result.required_margin_account, dec!(1000));
        assert_eq!(result.risk_amount_account, dec!(10));
        assert!(result.execution_msg.contains("Margin constrained"));
    }

    #[test]
    fn test_crypto_precision() {
        let signal = TradeSignal::builder(dec!(10000), dec!(1.5), dec!(60000), dec!(58700))
            .asset_class(AssetClass::Crypto)
            .leverage(dec!(10))
            .build()
            .unwrap();
        let result = sizer().calculate(&signal);
        // 150 / 1300 = 0.115384...
        assert_eq!(result.suggested_position_size, dec!(0.1153));
    }

    #[test]
    fn test_tiny_account_rounds_to_zero_stock() {
        let signal = TradeSignal::builder(dec!(100), dec!(1), dec!(50), dec!(45))
            .asset_class(AssetClass::Stock)
            .build()
            .unwrap();
        let result = sizer().calculate(&signal);
        assert_eq!(result.suggested_position_size, Decimal::ZERO);
        assert_eq!(result.risk_level, RiskLevel::Normal);
        assert!(result.execution_msg.contains("below minimum"));
    }

    #[test]
    fn test_risk_budget_never_exceeded_and_never_rounds_up() {
        let s = sizer();
        let entries = [dec!(1.2345), dec!(97.13), dec!(2011.7), dec!(43210.5)];
        let risks = [dec!(0.25), dec!(1), dec!(3.3), dec!(7)];
        for asset_class in AssetClass::ALL {
            for entry in entries {
                for risk in risks {
                    let stop = entry * dec!(0.987);
                    let signal = TradeSignal::builder(dec!(25000), risk, entry, stop)
                        .asset_class(asset_class)
                        .contract_size(dec!(10))
                        .leverage(dec!(50))
                        .exchange_rate(dec!(0.91))
                        .build()
                        .unwrap();
                    let result = s.calculate(&signal);
                    let per_unit = signal.stop_distance() * signal.contract_size * dec!(0.91);
                    let budget = signal.total_capital * risk / dec!(100);
                    let raw = budget / per_unit;

                    assert!(result.suggested_position_size <= raw);
                    assert!(result.suggested_position_size * per_unit <= budget * dec!(1.0001));
                    assert_eq!(s.calculate(&signal), result);
                }
            }
        }
    }
}
