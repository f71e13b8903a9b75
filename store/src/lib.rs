//! Abstract store collaborator traits for the purchase bridge.
//!
//! Every store backend (the platform transaction queue, the in-process
//! sandbox, test nullables) implements these traits. The bridge depends only
//! on the traits and the raw platform records defined here.

pub mod catalog;
pub mod error;
pub mod queue;
pub mod receipt;
pub mod transaction;

pub use catalog::{ProductCatalog, ProductRequestDelegate};
pub use error::{CatalogError, PlatformError, PlatformErrorCode};
pub use queue::{ObserverId, PaymentQueue, TransactionObserver};
pub use receipt::{ReceiptSource, ReceiptValidator, VerificationRequest};
pub use transaction::{Payment, RawTransaction, TransactionState};
