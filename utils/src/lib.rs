//! Shared utilities for the purchase bridge.

pub mod receipt;
pub mod time;

pub use receipt::{decode_receipt, encode_receipt};
pub use time::{format_age, format_duration};
