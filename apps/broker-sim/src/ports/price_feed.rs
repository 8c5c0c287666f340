//! Price Feed Port (Driven Port)
//!
//! Interface to the reference-price collaborator the worker prices
//! fills against. Any error makes the worker fall back to synthetic
//! pricing.

use async_trait::async_trait;

use crate::domain::Price;

/// Price feed error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PriceFeedError {
    /// Connection error.
    #[error("Price feed connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Symbol not found.
    #[error("Symbol not found: {symbol}")]
    SymbolNotFound {
        /// The unknown symbol.
        symbol: String,
    },

    /// Data unavailable.
    #[error("Price data unavailable")]
    DataUnavailable,
}

/// Port for resolving reference prices.
#[async_trait]
pub trait PriceFeedPort: Send + Sync {
    /// Get the last traded price for a symbol.
    async fn last_price(&self, symbol: &str) -> Result<Price, PriceFeedError>;
}
