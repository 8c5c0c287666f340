//! Price sources.
//!
//! Two [`PriceFeedPort`] implementations: a synthetic source drawing
//! pseudo-random prices and a fixed table for tests and demos. The
//! worker also falls back to [`synthetic_price`] directly when its
//! configured source fails.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use rust_decimal::Decimal;

use crate::domain::Price;
use crate::ports::{PriceFeedError, PriceFeedPort};

/// Draw a pseudo-random price in `[0, 100)` with exactly `precision`
/// decimal places.
///
/// The draw is an integer scaled by `10^precision`, so the result is
/// exact at the requested precision with no float rounding involved.
#[must_use]
pub fn synthetic_price(precision: u32) -> Price {
    let precision = precision.min(12);
    let upper = 100_i64 * 10_i64.pow(precision);
    let n = rand::rng().random_range(0..upper);
    Price::new(Decimal::new(n, precision))
}

/// Price source that answers every symbol with a synthetic price.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticPriceFeed {
    precision: u32,
}

impl SyntheticPriceFeed {
    /// Create a synthetic source drawing at `precision` decimals.
    #[must_use]
    pub const fn new(precision: u32) -> Self {
        Self { precision }
    }
}

#[async_trait]
impl PriceFeedPort for SyntheticPriceFeed {
    async fn last_price(&self, _symbol: &str) -> Result<Price, PriceFeedError> {
        Ok(synthetic_price(self.precision))
    }
}

/// Price source backed by a fixed symbol table.
///
/// Symbols without an entry report [`PriceFeedError::DataUnavailable`],
/// which exercises the worker's synthetic fallback.
#[derive(Debug, Default)]
pub struct FixedPriceFeed {
    prices: RwLock<HashMap<String, Price>>,
}

impl FixedPriceFeed {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
        }
    }

    /// Set the price for a symbol.
    pub fn set_price(&self, symbol: &str, price: Price) {
        self.prices.write().insert(symbol.to_string(), price);
    }

    /// Remove a symbol's entry.
    pub fn clear_price(&self, symbol: &str) {
        self.prices.write().remove(symbol);
    }
}

#[async_trait]
impl PriceFeedPort for FixedPriceFeed {
    async fn last_price(&self, symbol: &str) -> Result<Price, PriceFeedError> {
        self.prices
            .read()
            .get(symbol)
            .copied()
            .ok_or(PriceFeedError::DataUnavailable)
    }
}
