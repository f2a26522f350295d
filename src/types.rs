//! Re-exported types from external crates for convenience.
//!
//! These types are commonly used in this SDK and are re-exported here
//! so users don't need to add these dependencies to their `Cargo.toml`.

/// Date and time types for heartbeat timestamps.
pub use chrono::{DateTime, Utc};
/// Arbitrary precision decimal type for prices, volumes and account figures.
pub use rust_decimal::Decimal;
/// Macro for creating [`Decimal`] literals at compile time.
///
/// # Example
/// ```
/// use trading_bridge_sdk::types::dec;
/// let price = dec!(1.08452);
/// ```
pub use rust_decimal_macros::dec;
