pub mod context;
pub mod models;
pub mod signal;
pub mod traits;

pub use context::*;
pub use models::*;
pub use signal::*;
pub use traits::*;
