use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Exchange Rate Service Trait
// ---------------------------------------------------------------------------

/// Errors that can occur while resolving an exchange rate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RateError {
    #[error("Rate not available for {base}/{target}")]
    NotAvailable { base: String, target: String },
    #[error("Rate request failed: {0}")]
    Request(String),
    #[error("Malformed rate response: {0}")]
    Malformed(String),
    #[error("Non-positive rate {rate} for {base}/{target}")]
    NonPositive {
        base: String,
        target: String,
        rate: Decimal,
    },
}

/// Resolves how many units of `target` one unit of `base` is worth.
///
/// Implementations are called from synchronous sizing code and must bound
/// their own latency. Caching belongs to the implementation, not the caller.
pub trait ExchangeRateService: Send + Sync {
    fn get_realtime_rate(&self, base: &str, target: &str) -> Result<Decimal, RateError>;
}

impl<T: ExchangeRateService + ?Sized> ExchangeRateService for std::sync::Arc<T> {
    fn get_realtime_rate(&self, base: &str, target: &str) -> Result<Decimal, RateError> {
        (**self).get_realtime_rate(base, target)
    }
}

impl<T: ExchangeRateService + ?Sized> ExchangeRateService for Box<T> {
    fn get_realtime_rate(&self, base: &str, target: &str) -> Result<Decimal, RateError> {
        (**self).get_realtime_rate(base, target)
    }
}
