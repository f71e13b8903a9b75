//! Transaction bridge between a push-style store queue and request/response
//! callers.
//!
//! The store delivers unsolicited, batched transaction updates to a single
//! observer. [`StoreBridge`] turns that stream into one outcome per
//! `purchase`, `get_purchases` (restore) or `fetch_products` call:
//! - [`observer::BridgeObserver`] classifies each batch, buffers restored
//!   records, and finishes every terminal transaction exactly once,
//! - [`purchase::PurchaseCoordinator`] and [`restore::RestoreCoordinator`]
//!   correlate events with callers through a keyed one-shot registry,
//! - [`products::ProductInfoRequester`] adapts the catalog's delegate
//!   callback to a future,
//! - [`classifier`] maps platform error codes to [`iap_types::PurchaseError`].

pub mod bridge;
pub mod classifier;
pub mod config;
pub mod convert;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod observer;
pub mod products;
pub mod purchase;
pub mod receipt;
pub mod registry;
pub mod restore;
pub mod tracing_spans;

pub use bridge::StoreBridge;
pub use classifier::classify;
pub use config::BridgeConfig;
pub use convert::{purchase_from_transaction, restored_purchase};
pub use error::BridgeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::BridgeMetrics;
pub use observer::{BridgeObserver, RestoreOutcome, Settlement, TransactionEvent};
pub use products::ProductInfoRequester;
pub use purchase::PurchaseCoordinator;
pub use registry::{PendingRequests, RegisterError};
pub use restore::RestoreCoordinator;
