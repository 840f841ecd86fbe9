use riskdesk_core::{ExchangeRateService, RateError};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::normalize_code;

/// Static rate table. Useful for backtests, offline runs, and tests.
///
/// A pair that is only known in reverse is served as the inverse rate.
#[derive(Debug, Clone, Default)]
pub struct FixedRates {
    rates: HashMap<(String, String), Decimal>,
}

impl FixedRates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `1 base = rate target`. Non-positive rates are ignored.
    pub fn with_rate(mut self, base: &str, target: &str, rate: Decimal) -> Self {
        self.insert(base, target, rate);
        self
    }

    pub fn insert(&mut self, base: &str, target: &str, rate: Decimal) {
        if rate > Decimal::ZERO {
            self.rates
                .insert((normalize_code(base), normalize_code(target)), rate);
        }
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl ExchangeRateService for FixedRates {
    fn get_realtime_rate(&self, base: &str, target: &str) -> Result<Decimal, RateError> {
        let base = normalize_code(base);
        let target = normalize_code(target);
        if base == target {
            return Ok(Decimal::ONE);
        }
        if let Some(rate) = self.rates.get(&(base.clone(), target.clone())) {
            return Ok(*rate);
        }
        if let Some(inverse) = self.rates.get(&(target.clone(), base.clone())) {
            return Ok(Decimal::ONE / *inverse);
        }
        Err(RateError::NotAvailable { base, target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_direct_inverse_and_identity() {
        let rates = FixedRates::new().with_rate("usd", "JPY", dec!(150));
        assert_eq!(rates.get_realtime_rate("USD", "JPY").unwrap(), dec!(150));
        assert_eq!(
            rates.get_realtime_rate("JPY", "USD").unwrap(),
            Decimal::ONE / dec!(150)
        );
        assert_eq!(rates.get_realtime_rate("EUR", "eur").unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_unknown_pair() {
        let rates = FixedRates::new();
        assert_eq!(
            rates.get_realtime_rate("GBP", "CHF"),
            Err(RateError::NotAvailable {
                base: "GBP".to_string(),
                target: "CHF".to_string()
            })
        );
    }

    #[test]
    fn test_non_positive_rate_ignored() {
        let rates = FixedRates::new().with_rate("EUR", "USD", dec!(0));
        assert!(rates.is_empty());
    }
}
