//! Catalog product metadata.

use serde::{Deserialize, Serialize};

use crate::ProductId;

/// Micro-units per currency unit (`1.99` is `1_990_000`).
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// A product as returned by the store catalog.
///
/// Only ever created from a catalog response and never mutated afterwards.
/// Prices are fixed-point integers in micro-units of `currency_code` to keep
/// floating point out of money.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Localized display name.
    pub title: String,
    /// Localized description.
    pub description: String,
    pub price_micros: i64,
    /// Store-formatted price for display, e.g. `"$1.99"`.
    pub formatted_price: String,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

impl Product {
    /// Whole currency units, truncated.
    pub fn price_units(&self) -> i64 {
        self.price_micros / MICROS_PER_UNIT
    }

    pub fn is_free(&self) -> bool {
        self.price_micros == 0
    }
}
