//! Exchange-rate resolution for position sizing.
//!
//! [`HttpRateSource`] fetches live quotes, [`FixedRates`] serves a static
//! table, and [`CachedRateService`] wraps either one with a per-pair TTL.

pub mod cache;
pub mod fixed;
pub mod http;

pub use cache::CachedRateService;
pub use fixed::FixedRates;
pub use http::HttpRateSource;

use riskdesk_core::RateError;
use serde::{Deserialize, Serialize};

/// Exchange-rate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxConfig {
    /// Base URL of a `/latest?from=..&to=..` rates API.
    pub base_url: String,
    /// How long a fetched rate stays valid.
    pub cache_ttl_secs: u64,
    /// Upper bound on a single HTTP lookup.
    pub timeout_secs: u64,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.frankfurter.app".to_string(),
            cache_ttl_secs: 300,
            timeout_secs: 10,
        }
    }
}

/// The live HTTP source behind a TTL cache, as configured.
pub fn live_service(config: &FxConfig) -> Result<CachedRateService<HttpRateSource>, RateError> {
    let source = HttpRateSource::new(config)?;
    Ok(CachedRateService::new(source, config.cache_ttl_secs))
}

/// Uppercase, trimmed ISO code.
pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
