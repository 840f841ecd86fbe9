use chrono::{DateTime, NaiveDateTime, Utc};
use riskdesk_core::{Bar, Side, Trade};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use crate::DataError;

/// Load OHLCV bars from a CSV file.
///
/// Expected columns (case-insensitive, flexible ordering):
/// `timestamp` (or `date`, `datetime`, `time`), `open`, `high`, `low`, `close`,
/// optional `volume` / `tick_volume`.
pub fn load_bars_from_csv(path: &Path) -> Result<Vec<Bar>, DataError> {
    let instrument = file_stem(path);
    let (mut reader, headers) = open(path)?;
    let col = resolve_bar_columns(&headers)?;

    let mut bars = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| DataError::Parse(format!("CSV record error: {}", e)))?;

        bars.push(Bar {
            instrument: instrument.clone(),
            timestamp: parse_timestamp(field(&record, col.timestamp)?)?,
            open: parse_decimal(field(&record, col.open)?, "open")?,
            high: parse_decimal(field(&record, col.high)?, "high")?,
            low: parse_decimal(field(&record, col.low)?, "low")?,
            close: parse_decimal(field(&record, col.close)?, "close")?,
            volume: match col.volume {
                Some(idx) => parse_decimal(field(&record, idx)?, "volume")?,
                None => Decimal::ZERO,
            },
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    debug!(path = %path.display(), bars = bars.len(), "Loaded bars");
    Ok(bars)
}

/// Load closed trades with their excursions from a CSV export.
///
/// Required: `side` (`buy`/`sell`/`long`/`short`, or MT5 deal types `0`/`1`),
/// `volume`, `entry_price`, `exit_price`, `pnl`, `mae`, `mfe`.
/// Optional: `symbol`, `commission`, `entry_time`, `exit_time`.
/// Common MT5 aliases (`lots`, `price_open`, `profit`, ...) are accepted.
pub fn load_trades_from_csv(path: &Path) -> Result<Vec<Trade>, DataError> {
    let default_instrument = file_stem(path);
    let (mut reader, headers) = open(path)?;

    let required = |names: &[&str], what: &str| {
        find_column(&headers, names)
            .ok_or_else(|| DataError::Parse(format!("No {} column found", what)))
    };
    let side_col = required(&["side", "type", "direction"], "side")?;
    let qty_col = required(&["volume", "lots", "quantity", "qty"], "volume")?;
    let entry_col = required(&["entry_price", "price_open", "open_price"], "entry price")?;
    let exit_col = required(&["exit_price", "price_close", "close_price"], "exit price")?;
    let pnl_col = required(&["pnl", "profit"], "pnl")?;
    let mae_col = required(&["mae", "max_adverse_excursion"], "mae")?;
    let mfe_col = required(&["mfe", "max_favorable_excursion"], "mfe")?;
    let symbol_col = find_column(&headers, &["symbol", "instrument"]);
    let commission_col = find_column(&headers, &["commission", "fee", "fees"]);
    let entry_time_col = find_column(&headers, &["entry_time", "open_time", "time_open"]);
    let exit_time_col = find_column(&headers, &["exit_time", "close_time", "time_close"]);

    let mut trades = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| DataError::Parse(format!("CSV record error: {}", e)))?;

        let side_raw = field(&record, side_col)?;
        let side = parse_side(side_raw).ok_or_else(|| {
            DataError::Parse(format!("Unknown side '{}' on row {}", side_raw, line + 1))
        })?;

        let instrument = match symbol_col {
            Some(idx) => field(&record, idx)?.to_string(),
            None => default_instrument.clone(),
        };
        let commission = match commission_col {
            Some(idx) => parse_decimal(field(&record, idx)?, "commission")?.abs(),
            None => Decimal::ZERO,
        };
        let exit_time = match exit_time_col {
            Some(idx) => parse_timestamp(field(&record, idx)?)?,
            None => DateTime::<Utc>::UNIX_EPOCH,
        };
        let entry_time = match entry_time_col {
            Some(idx) => parse_timestamp(field(&record, idx)?)?,
            None => exit_time,
        };

        trades.push(Trade {
            id: Uuid::new_v4(),
            instrument,
            side,
            quantity: parse_decimal(field(&record, qty_col)?, "volume")?,
            entry_price: parse_decimal(field(&record, entry_col)?, "entry_price")?,
            exit_price: parse_decimal(field(&record, exit_col)?, "exit_price")?,
            pnl: parse_decimal(field(&record, pnl_col)?, "pnl")?,
            commission,
            mae: parse_decimal(field(&record, mae_col)?, "mae")?,
            mfe: parse_decimal(field(&record, mfe_col)?, "mfe")?,
            entry_time,
            exit_time,
        });
    }

    debug!(path = %path.display(), trades = trades.len(), "Loaded trade history");
    Ok(trades)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct BarColumnMap {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

fn open(path: &Path) -> Result<(csv::Reader<std::fs::File>, csv::StringRecord), DataError> {
    if !path.exists() {
        return Err(DataError::NotFound(format!(
            "CSV file not found: {}",
            path.display()
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::Parse(format!("Failed to open CSV {}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| DataError::Parse(format!("Failed to read headers: {}", e)))?
        .clone();
    Ok((reader, headers))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn resolve_bar_columns(headers: &csv::StringRecord) -> Result<BarColumnMap, DataError> {
    let missing = |what: &str| DataError::Parse(format!("No {} column found", what));
    Ok(BarColumnMap {
        timestamp: find_column(headers, &["timestamp", "date", "datetime", "time"])
            .ok_or_else(|| missing("timestamp"))?,
        open: find_column(headers, &["open", "o"]).ok_or_else(|| missing("open"))?,
        high: find_column(headers, &["high", "h"]).ok_or_else(|| missing("high"))?,
        low: find_column(headers, &["low", "l"]).ok_or_else(|| missing("low"))?,
        close: find_column(headers, &["close", "c"]).ok_or_else(|| missing("close"))?,
        volume: find_column(headers, &["volume", "tick_volume", "vol", "v"]),
    })
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let h = header.trim().to_lowercase();
        names.iter().any(|name| h == *name)
    })
}

/// Short rows are an error rather than a panic.
fn field(record: &csv::StringRecord, idx: usize) -> Result<&str, DataError> {
    record
        .get(idx)
        .ok_or_else(|| DataError::Parse(format!("Row is missing column {}", idx + 1)))
}

fn parse_side(s: &str) -> Option<Side> {
    match s.trim() {
        "0" => Some(Side::Buy),
        "1" => Some(Side::Sell),
        other => Side::from_label(other),
    }
}

fn parse_decimal(s: &str, field: &str) -> Result<Decimal, DataError> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|e| DataError::Parse(format!("Failed to parse {} '{}': {}", field, s, e)))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DataError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Without timezone, assume UTC. `%Y.%m.%d` is the MT5 terminal export format.
    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y.%m.%d %H:%M:%S",
        "%Y.%m.%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y%m%d %H:%M:%S",
    ];
    for fmt in &formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    // Unix seconds
    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt);
        }
    }

    Err(DataError::Parse(format!("Unable to parse timestamp: '{}'", s)))
}
