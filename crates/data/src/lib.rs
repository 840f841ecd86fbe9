pub mod csv_loader;

pub use csv_loader::{load_bars_from_csv, load_trades_from_csv};

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Data not found: {0}")]
    NotFound(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
