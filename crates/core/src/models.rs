use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Asset class
// ---------------------------------------------------------------------------

/// The asset class an instrument belongs to. Determines the tradable size
/// increment used when rounding a suggested position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetClass {
    Stock,
    Future,
    Forex,
    Crypto,
}

impl AssetClass {
    pub const ALL: [AssetClass; 4] = [
        AssetClass::Stock,
        AssetClass::Future,
        AssetClass::Forex,
        AssetClass::Crypto,
    ];

    /// Number of decimal places a position size may carry.
    pub fn size_precision(&self) -> u32 {
        match self {
            AssetClass::Stock | AssetClass::Future => 0,
            AssetClass::Forex => 2,
            AssetClass::Crypto => 4,
        }
    }

    /// Quantize a raw size to the tradable increment, always toward zero.
    pub fn round_size(&self, raw: Decimal) -> Decimal {
        raw.round_dp_with_strategy(self.size_precision(), RoundingStrategy::ToZero)
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "stock" | "stocks" | "equity" => Some(AssetClass::Stock),
            "future" | "futures" => Some(AssetClass::Future),
            "forex" | "fx" | "cfd" => Some(AssetClass::Forex),
            "crypto" => Some(AssetClass::Crypto),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AssetClass::Stock => "STOCK",
            AssetClass::Future => "FUTURE",
            AssetClass::Forex => "FOREX",
            AssetClass::Crypto => "CRYPTO",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Trade direction. `Buy` is long, `Sell` is short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => Decimal::NEGATIVE_ONE,
        }
    }

    /// Parse the direction labels used by analysis payloads.
    /// Anything unrecognised (including "neutral" / "hold") is `None`.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "long" | "bull" | "bullish" | "up" => Some(Side::Buy),
            "sell" | "short" | "bear" | "bearish" | "down" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => f.write_str("buy"),
            Side::Sell => f.write_str("sell"),
        }
    }
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// A single OHLCV bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub instrument: String,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A currently open position, one leg of a basket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub instrument: String,
    pub side: Side,
    /// Volume in lots.
    pub quantity: Decimal,
    pub avg_entry_price: Decimal,
    pub contract_size: Decimal,
    /// Floating P/L in account currency.
    pub unrealized_pnl: Decimal,
}

impl Position {
    /// Recompute floating P/L from the current price.
    /// `rate` converts quote currency into account currency.
    pub fn update_pnl(&mut self, current_price: Decimal, rate: Decimal) {
        let price_diff = match self.side {
            Side::Buy => current_price - self.avg_entry_price,
            Side::Sell => self.avg_entry_price - current_price,
        };
        self.unrealized_pnl = price_diff * self.quantity * self.contract_size * rate;
    }
}

// ---------------------------------------------------------------------------
// Trade (closed position)
// ---------------------------------------------------------------------------

/// A completed trade with realized P/L and its excursion extremes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub instrument: String,
    pub side: Side,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub pnl: Decimal,
    pub commission: Decimal,
    /// Maximum adverse excursion in account currency (worst floating loss,
    /// stored as a magnitude or a negative number; both are accepted).
    pub mae: Decimal,
    /// Maximum favorable excursion in account currency.
    pub mfe: Decimal,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
}

impl Trade {
    pub fn net_pnl(&self) -> Decimal {
        self.pnl - self.commission
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_size_floors_per_asset_class() {
        assert_eq!(AssetClass::Stock.round_size(dec!(12.99)), dec!(12));
        assert_eq!(AssetClass::Future.round_size(dec!(0.999)), dec!(0));
        assert_eq!(AssetClass::Forex.round_size(dec!(0.1299)), dec!(0.12));
        assert_eq!(AssetClass::Crypto.round_size(dec!(0.123456)), dec!(0.1234));
    }

    #[test]
    fn test_side_labels() {
        assert_eq!(Side::from_label("Bullish"), Some(Side::Buy));
        assert_eq!(Side::from_label(" short "), Some(Side::Sell));
        assert_eq!(Side::from_label("neutral"), None);
        assert_eq!(Side::Sell.sign(), dec!(-1));
    }

    #[test]
    fn test_position_pnl_short() {
        let mut pos = Position {
            instrument: "EURUSD".to_string(),
            side: Side::Sell,
            quantity: dec!(0.5),
            avg_entry_price: dec!(1.1000),
            contract_size: dec!(100000),
            unrealized_pnl: Decimal::ZERO,
        };
        pos.update_pnl(dec!(1.0950), Decimal::ONE);
        assert_eq!(pos.unrealized_pnl, dec!(250));
    }
}
