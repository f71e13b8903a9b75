//! Nullable infrastructure for deterministic testing.
//!
//! Every store collaborator (payment queue, catalog, receipt source,
//! receipt validator) has a test-friendly implementation here that:
//! - Records every call for later assertions
//! - Answers from scripts the test sets up, or on explicit command
//! - Never touches a real store or the network
//!
//! Usage: hand these to `StoreBridge::new` in place of the real collaborators.

pub mod catalog;
pub mod queue;
pub mod receipt;
pub mod transactions;

pub use catalog::{NullCatalog, NullCatalogMode};
pub use queue::NullPaymentQueue;
pub use receipt::{NullReceiptSource, NullValidator};
