use chrono::{DateTime, Duration, Utc};
use riskdesk_core::{ExchangeRateService, RateError};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

use crate::normalize_code;

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    rate: Decimal,
    fetched_at: DateTime<Utc>,
}

/// Time-bound cache in front of any rate source.
///
/// Entries expire `ttl` after they were fetched. A failed refresh is reported
/// to the caller; expired entries are never served.
pub struct CachedRateService<S> {
    source: S,
    ttl: Duration,
    entries: RwLock<HashMap<(String, String), CachedRate>>,
}

impl<S: ExchangeRateService> CachedRateService<S> {
    pub fn new(source: S, ttl_secs: u64) -> Self {
        Self {
            source,
            ttl: i64::try_from(ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Drop every cached pair.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn fresh(&self, key: &(String, String), now: DateTime<Utc>) -> Option<Decimal> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|c| now - c.fetched_at < self.ttl)
            .map(|c| c.rate)
    }
}

impl<S: ExchangeRateService> ExchangeRateService for CachedRateService<S> {
    fn get_realtime_rate(&self, base: &str, target: &str) -> Result<Decimal, RateError> {
        let key = (normalize_code(base), normalize_code(target));
        if key.0 == key.1 {
            return Ok(Decimal::ONE);
        }

        let now = Utc::now();
        if let Some(rate) = self.fresh(&key, now) {
            debug!(base = %key.0, target = %key.1, %rate, "Exchange rate cache hit");
            return Ok(rate);
        }

        let rate = match self.source.get_realtime_rate(&key.0, &key.1) {
            Ok(rate) if rate > Decimal::ZERO => rate,
            Ok(rate) => {
                return Err(RateError::NonPositive {
                    base: key.0,
                    target: key.1,
                    rate,
                })
            }
            Err(e) => {
                warn!(base = %key.0, target = %key.1, error = %e, "Exchange rate refresh failed");
                return Err(e);
            }
        };

        debug!(base = %key.0, target = %key.1, %rate, "Exchange rate refreshed");
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, CachedRate { rate, fetched_at: now });
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedRates;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        rate: Decimal,
    }

    impl ExchangeRateService for CountingSource {
        fn get_realtime_rate(&self, _base: &str, _target: &str) -> Result<Decimal, RateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rate)
        }
    }

    fn counting(rate: Decimal) -> CountingSource {
        CountingSource {
            calls: AtomicUsize::new(0),
            rate,
        }
    }

    #[test]
    fn test_cache_hit_within_ttl() {
        let cache = CachedRateService::new(counting(dec!(1.08)), 300);
        assert_eq!(cache.get_realtime_rate("EUR", "USD").unwrap(), dec!(1.08));
        assert_eq!(cache.get_realtime_rate("eur", "usd").unwrap(), dec!(1.08));
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_ttl_always_refetches() {
        let cache = CachedRateService::new(counting(dec!(1.08)), 0);
        cache.get_realtime_rate("EUR", "USD").unwrap();
        cache.get_realtime_rate("EUR", "USD").unwrap();
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clear_forces_refetch() {
        let cache = CachedRateService::new(counting(dec!(0.5)), 300);
        cache.get_realtime_rate("GBP", "USD").unwrap();
        cache.clear();
        cache.get_realtime_rate("GBP", "USD").unwrap();
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_identity_bypasses_source() {
        let cache = CachedRateService::new(counting(dec!(2)), 300);
        assert_eq!(cache.get_realtime_rate("USD", "USD").unwrap(), Decimal::ONE);
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_non_positive_rate_is_error() {
        let cache = CachedRateService::new(counting(dec!(0)), 300);
        assert!(matches!(
            cache.get_realtime_rate("EUR", "USD"),
            Err(RateError::NonPositive { .. })
        ));
    }

    #[test]
    fn test_source_error_propagates() {
        let cache = CachedRateService::new(FixedRates::new(), 300);
        assert!(matches!(
            cache.get_realtime_rate("EUR", "USD"),
            Err(RateError::NotAvailable { .. })
        ));
    }
}
