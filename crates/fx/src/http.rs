use reqwest::blocking::Client;
use riskdesk_core::{ExchangeRateService, RateError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::{normalize_code, FxConfig};

/// `{"amount": 1.0, "base": "EUR", "date": "...", "rates": {"USD": 1.0842}}`
#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, Decimal>,
}

/// Blocking client for a frankfurter-style rates API.
pub struct HttpRateSource {
    client: Client,
    base_url: String,
}

impl HttpRateSource {
    pub fn new(config: &FxConfig) -> Result<Self, RateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RateError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Pull `target` out of a response body.
fn extract_rate(body: &str, base: &str, target: &str) -> Result<Decimal, RateError> {
    let parsed: LatestRatesResponse =
        serde_json::from_str(body).map_err(|e| RateError::Malformed(e.to_string()))?;

    let rate = parsed
        .rates
        .get(target)
        .copied()
        .ok_or_else(|| RateError::NotAvailable {
            base: base.to_string(),
            target: target.to_string(),
        })?;

    if rate <= Decimal::ZERO {
        return Err(RateError::NonPositive {
            base: base.to_string(),
            target: target.to_string(),
            rate,
        });
    }
    Ok(rate)
}

impl ExchangeRateService for HttpRateSource {
    fn get_realtime_rate(&self, base: &str, target: &str) -> Result<Decimal, RateError> {
        let base = normalize_code(base);
        let target = normalize_code(target);
        if base == target {
            return Ok(Decimal::ONE);
        }

        let url = format!("{}/latest", self.base_url);
        debug!(%url, %base, %target, "Fetching exchange rate");

        let response = self
            .client
            .get(&url)
            .query(&[("from", base.as_str()), ("to", target.as_str())])
            .send()
            .map_err(|e| RateError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Request(format!("HTTP {} from {}", status, url)));
        }

        let body = response
            .text()
            .map_err(|e| RateError::Request(format!("Failed to read body: {}", e)))?;

        extract_rate(&body, &base, &target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_extract_rate() {
        let body = r#"{"amount":1.0,"base":"EUR","date":"2024-05-01","rates":{"USD":1.0842}}"#;
        assert_eq!(extract_rate(body, "EUR", "USD").unwrap(), dec!(1.0842));
    }

    #[test]
    fn test_extract_missing_target() {
        let body = r#"{"rates":{"GBP":0.85}}"#;
        assert!(matches!(
            extract_rate(body, "EUR", "USD"),
            Err(RateError::NotAvailable { .. })
        ));
    }

    #[test]
    fn test_extract_malformed() {
        assert!(matches!(
            extract_rate("<html>", "EUR", "USD"),
            Err(RateError::Malformed(_))
        ));
    }

    #[test]
    fn test_identity_pair_skips_network() {
        let source = HttpRateSource::new(&FxConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(source.base_url(), "http://127.0.0.1:9");
        assert_eq!(source.get_realtime_rate("usd", "USD").unwrap(), Decimal::ONE);
    }
}
