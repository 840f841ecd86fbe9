use crate::models::AssetClass;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Validation failures for a [`TradeSignal`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("Total capital must be positive, got {0}")]
    NonPositiveCapital(Decimal),
    #[error("Risk percent must be in (0, 100], got {0}")]
    RiskPercentOutOfRange(Decimal),
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: Decimal },
    #[error("Stop-loss price equals entry price ({0}): zero risk distance")]
    ZeroRiskDistance(Decimal),
    #[error("Drawdown percentages must be non-negative")]
    NegativeDrawdown,
    #[error("Manual exchange rate must be positive, got {0}")]
    InvalidExchangeRate(Decimal),
    #[error("Currency code must not be empty")]
    EmptyCurrency,
}

/// Input to position sizing.
///
/// Build through [`TradeSignal::builder`]; the builder rejects malformed input
/// so the sizer never has to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub total_capital: Decimal,
    pub account_currency: String,
    pub quote_currency: String,
    pub risk_percent: Decimal,
    pub entry_price: Decimal,
    pub stop_loss_price: Decimal,
    pub asset_class: AssetClass,
    pub contract_size: Decimal,
    pub leverage: Decimal,
    pub current_drawdown_percent: Decimal,
    pub max_drawdown_percent: Decimal,
    /// Manually supplied quote→account rate; skips the live lookup.
    pub exchange_rate: Option<Decimal>,
}

impl TradeSignal {
    pub fn builder(
        total_capital: Decimal,
        risk_percent: Decimal,
        entry_price: Decimal,
        stop_loss_price: Decimal,
    ) -> TradeSignalBuilder {
        TradeSignalBuilder {
            signal: TradeSignal {
                total_capital,
                account_currency: "USD".to_string(),
                quote_currency: "USD".to_string(),
                risk_percent,
                entry_price,
                stop_loss_price,
                asset_class: AssetClass::Forex,
                contract_size: Decimal::ONE,
                leverage: Decimal::ONE,
                current_drawdown_percent: Decimal::ZERO,
                max_drawdown_percent: Decimal::ONE_HUNDRED,
                exchange_rate: None,
            },
        }
    }

    /// Check the data-model invariants.
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.total_capital <= Decimal::ZERO {
            return Err(SignalError::NonPositiveCapital(self.total_capital));
        }
        if self.risk_percent <= Decimal::ZERO || self.risk_percent > Decimal::ONE_HUNDRED {
            return Err(SignalError::RiskPercentOutOfRange(self.risk_percent));
        }
        for (field, value) in [
            ("entry_price", self.entry_price),
            ("stop_loss_price", self.stop_loss_price),
            ("contract_size", self.contract_size),
            ("leverage", self.leverage),
        ] {
            if value <= Decimal::ZERO {
                return Err(SignalError::NonPositive { field, value });
            }
        }
        if self.stop_loss_price == self.entry_price {
            return Err(SignalError::ZeroRiskDistance(self.entry_price));
        }
        if self.current_drawdown_percent.is_sign_negative()
            || self.max_drawdown_percent.is_sign_negative()
        {
            return Err(SignalError::NegativeDrawdown);
        }
        if let Some(rate) = self.exchange_rate {
            if rate <= Decimal::ZERO {
                return Err(SignalError::InvalidExchangeRate(rate));
            }
        }
        if self.account_currency.trim().is_empty() || self.quote_currency.trim().is_empty() {
            return Err(SignalError::EmptyCurrency);
        }
        Ok(())
    }

    /// Absolute price distance between entry and stop.
    pub fn stop_distance(&self) -> Decimal {
        (self.entry_price - self.stop_loss_price).abs()
    }
}

/// Chained construction of a validated [`TradeSignal`].
#[derive(Debug, Clone)]
pub struct TradeSignalBuilder {
    signal: TradeSignal,
}

impl TradeSignalBuilder {
    pub fn currencies(mut self, account: &str, quote: &str) -> Self {
        self.signal.account_currency = account.trim().to_uppercase();
        self.signal.quote_currency = quote.trim().to_uppercase();
        self
    }

    pub fn asset_class(mut self, asset_class: AssetClass) -> Self {
        self.signal.asset_class = asset_class;
        self
    }

    pub fn contract_size(mut self, contract_size: Decimal) -> Self {
        self.signal.contract_size = contract_size;
        self
    }

    pub fn leverage(mut self, leverage: Decimal) -> Self {
        self.signal.leverage = leverage;
        self
    }

    pub fn drawdown(mut self, current_percent: Decimal, max_percent: Decimal) -> Self {
        self.signal.current_drawdown_percent = current_percent;
        self.signal.max_drawdown_percent = max_percent;
        self
    }

    pub fn exchange_rate(mut self, rate: Decimal) -> Self {
        self.signal.exchange_rate = Some(rate);
        self
    }

    pub fn build(self) -> Result<TradeSignal, SignalError> {
        self.signal.validate()?;
        Ok(self.signal)
    }
}

/// Outcome tag of a sizing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Normal,
    /// Size was cut down to what the margin allows.
    High,
    Blocked,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Normal => f.write_str("NORMAL"),
            RiskLevel::High => f.write_str("HIGH"),
            RiskLevel::Blocked => f.write_str("BLOCKED"),
        }
    }
}

/// Output of position sizing. Blocked results carry zeroed numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub suggested_position_size: Decimal,
    /// Notional value in quote currency.
    pub position_value_quote: Decimal,
    /// Loss at the stop, in account currency, for the suggested size.
    pub risk_amount_account: Decimal,
    /// Margin in account currency for the suggested size.
    pub required_margin_account: Decimal,
    pub exchange_rate_used: Decimal,
    pub risk_level: RiskLevel,
    pub execution_msg: String,
}

impl CalculationResult {
    pub fn blocked(msg: impl Into<String>) -> Self {
        Self {
            suggested_position_size: Decimal::ZERO,
            position_value_quote: Decimal::ZERO,
            risk_amount_account: Decimal::ZERO,
            required_margin_account: Decimal::ZERO,
            exchange_rate_used: Decimal::ZERO,
            risk_level: RiskLevel::Blocked,
            execution_msg: msg.into(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.risk_level == RiskLevel::Blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_builder_rejects_zero_distance() {
        let err = TradeSignal::builder(dec!(10000), dec!(1), dec!(1.1), dec!(1.1))
            .build()
            .unwrap_err();
        assert_eq!(err, SignalError::ZeroRiskDistance(dec!(1.1)));
    }

    #[test]
    fn test_builder_rejects_bad_risk_percent() {
        let err = TradeSignal::builder(dec!(10000), dec!(150), dec!(1.1), dec!(1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, SignalError::RiskPercentOutOfRange(_)));
    }

    #[test]
    fn test_builder_rejects_non_positive_leverage() {
        let err = TradeSignal::builder(dec!(10000), dec!(1), dec!(1.1), dec!(1.0))
            .leverage(dec!(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, SignalError::NonPositive { field: "leverage", .. }));
    }

    #[test]
    fn test_builder_normalizes_currency_codes() {
        let signal = TradeSignal::builder(dec!(10000), dec!(1), dec!(1.1), dec!(1.0))
            .currencies(" eur", "jpy ")
            .build()
            .unwrap();
        assert_eq!(signal.account_currency, "EUR");
        assert_eq!(signal.quote_currency, "JPY");
        assert_eq!(signal.stop_distance(), dec!(0.1));
    }

    #[test]
    fn test_risk_level_serializes_uppercase() {
        let json = serde_json::to_string(&RiskLevel::Blocked).unwrap();
        assert_eq!(json, "\"BLOCKED\"");
    }
}
