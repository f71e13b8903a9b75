//! Pre-built [`tracing::Span`] constructors for bridge operations.
//!
//! Consistent span names and field sets make it easy to follow one purchase
//! from submission through settlement in any trace backend.

use tracing::{debug_span, info_span, Span};

/// Span covering one caller-initiated purchase.
pub fn purchase_span(product_id: &str, item_type: &str) -> Span {
    info_span!("purchase", product = %product_id, item_type = %item_type)
}

/// Span covering one restore of completed transactions.
pub fn restore_span(item_type: &str) -> Span {
    info_span!("restore", item_type = %item_type)
}

/// Span covering one catalog lookup.
pub fn fetch_products_span(item_type: &str, count: usize) -> Span {
    info_span!("fetch_products", item_type = %item_type, count = %count)
}

/// Span covering the processing of one queue update batch.
pub fn batch_span(size: usize) -> Span {
    debug_span!("transaction_batch", size = %size)
}
