//! Volatility inputs for the basket risk engine.

pub mod atr;

pub use atr::{true_range, Atr};

use rust_decimal::Decimal;

/// A streaming indicator fed one close at a time.
pub trait Indicator: Send + Sync {
    /// Feed a close; `None` until warmed up.
    fn next(&mut self, value: Decimal) -> Option<Decimal>;

    fn reset(&mut self);

    /// Samples needed before the first output.
    fn period(&self) -> usize;

    fn is_ready(&self) -> bool;
}
