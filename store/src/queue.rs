//! Payment queue and observer traits.

use std::fmt;
use std::sync::Arc;

use crate::{Payment, PlatformError, RawTransaction};

/// Handle returned by [`PaymentQueue::add_observer`], used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// The store's transaction queue.
///
/// All methods are side-effecting and return immediately; outcomes arrive
/// later, off the caller's stack, through [`TransactionObserver`] callbacks.
pub trait PaymentQueue: Send + Sync {
    /// Start a payment for a product.
    fn submit_payment(&self, payment: Payment);

    /// Ask the store to redeliver every completed transaction as `Restored`.
    fn restore_completed_transactions(&self);

    /// Acknowledge a transaction so the store stops redelivering it.
    fn finish_transaction(&self, transaction: &RawTransaction);

    fn add_observer(&self, observer: Arc<dyn TransactionObserver>) -> ObserverId;

    fn remove_observer(&self, id: ObserverId);
}

/// Callback surface the store queue invokes.
///
/// Calls may arrive on any thread, in any order relative to the call that
/// triggered them. Implementations must not block.
pub trait TransactionObserver: Send + Sync {
    /// A batch of transaction updates, possibly of mixed states.
    fn on_transactions_updated(&self, batch: Vec<RawTransaction>);

    /// All `Restored` transactions for the current restore have been delivered.
    fn on_restore_completed(&self);

    fn on_restore_failed(&self, error: PlatformError);
}
