//! The transaction observer: sole listener on the store queue.
//!
//! Every batch the queue delivers goes through [`BridgeObserver`], which
//! - buffers `Restored` records until the restore completes,
//! - emits a [`Settlement`] for each `Purchased` / `Failed` record and then
//!   finishes it with the queue, whether or not anybody is waiting,
//! - ignores `Purchasing` / `Deferred` records, which are not terminal yet.
//!
//! Settlements are routed to the caller waiting on that product id through a
//! [`PendingRequests`] registry; restore outcomes go to the single restore
//! slot. Every event is also fanned out on a broadcast channel so a host can
//! watch transactions nobody asked for (e.g. a purchase started from outside
//! this process).

use std::sync::{Arc, Mutex};

use iap_store::{
    PaymentQueue, PlatformError, RawTransaction, TransactionObserver, TransactionState,
};
use iap_types::ProductId;
use tokio::sync::{broadcast, oneshot};

use crate::metrics::BridgeMetrics;
use crate::registry::{PendingRequests, RegisterError};
use crate::tracing_spans::batch_span;

/// A terminal (`Purchased` or `Failed`) transaction.
#[derive(Clone, Debug)]
pub struct Settlement {
    pub product_id: ProductId,
    pub success: bool,
    pub transaction: RawTransaction,
}

/// How a restore ended.
#[derive(Clone, Debug)]
pub enum RestoreOutcome {
    /// Every restored transaction accumulated for this restore.
    Completed(Vec<RawTransaction>),
    /// The store reported failure; carries the platform message.
    Failed(String),
}

/// Everything the observer publishes on the broadcast channel.
#[derive(Clone, Debug)]
pub enum TransactionEvent {
    Settled(Settlement),
    RestoreFinished(RestoreOutcome),
}

/// Key of the single, process-wide restore request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RestoreSlot;

pub struct BridgeObserver {
    queue: Arc<dyn PaymentQueue>,
    settlements: PendingRequests<ProductId, Settlement>,
    restores: PendingRequests<RestoreSlot, RestoreOutcome>,
    /// Restored records of the in-flight restore. Only touched by the batch
    /// and restore-completion callbacks.
    restored: Mutex<Vec<RawTransaction>>,
    updates: broadcast::Sender<TransactionEvent>,
    metrics: Arc<BridgeMetrics>,
    clear_restore_buffer_on_failure: bool,
}

impl BridgeObserver {
    pub fn new(
        queue: Arc<dyn PaymentQueue>,
        updates: broadcast::Sender<TransactionEvent>,
        metrics: Arc<BridgeMetrics>,
        clear_restore_buffer_on_failure: bool,
    ) -> Self {
        Self {
            queue,
            settlements: PendingRequests::new(),
            restores: PendingRequests::new(),
            restored: Mutex::new(Vec::new()),
            updates,
            metrics,
            clear_restore_buffer_on_failure,
        }
    }

    /// Wait for the next settlement of `product_id`.
    ///
    /// Must be called before the payment is submitted: the queue may answer
    /// before `submit_payment` even returns.
    pub fn await_settlement(
        &self,
        product_id: ProductId,
    ) -> Result<oneshot::Receiver<Settlement>, RegisterError> {
        self.settlements.register(product_id)
    }

    /// Wait for the next restore outcome. Only one restore may be pending.
    pub fn await_restore(&self) -> Result<oneshot::Receiver<RestoreOutcome>, RegisterError> {
        self.restores.register(RestoreSlot)
    }

    /// Number of callers currently waiting on a settlement or a restore.
    pub fn pending_requests(&self) -> usize {
        self.settlements.len() + self.restores.len()
    }

    /// Restored records buffered for the in-flight restore.
    pub fn buffered_restores(&self) -> usize {
        self.restored.lock().unwrap().len()
    }

    /// Fail every waiting caller and refuse new ones. Their receivers observe
    /// a closed channel; later registrations get [`RegisterError::Closed`].
    pub fn shutdown(&self) -> usize {
        let dropped = self.settlements.close() + self.restores.close();
        if dropped > 0 {
            tracing::info!(dropped, "observer shut down with pending requests");
        }
        dropped
    }

    fn publish(&self, event: TransactionEvent) {
        if self.updates.receiver_count() > 0 {
            let _ = self.updates.send(event);
        }
    }

    fn settle(&self, transaction: RawTransaction) {
        let success = transaction.state == TransactionState::Purchased;
        if success {
            self.metrics.transactions_purchased.inc();
        } else {
            self.metrics.transactions_failed.inc();
        }

        let settlement = Settlement {
            product_id: transaction.product_id().clone(),
            success,
            transaction,
        };
        self.publish(TransactionEvent::Settled(settlement.clone()));

        let product_id = settlement.product_id.clone();
        let transaction_id = settlement.transaction.transaction_id.clone();
        let claimed = self.settlements.resolve(&product_id, settlement.clone());
        if !claimed {
            self.metrics.settlements_unclaimed.inc();
            tracing::debug!(product = %product_id, success, "settlement with no caller waiting");
        }

        // Only after the event is out.
        self.queue.finish_transaction(&settlement.transaction);
        self.metrics.transactions_finished.inc();
        tracing::debug!(
            product = %product_id,
            transaction = ?transaction_id,
            success,
            claimed,
            "transaction settled and finished"
        );
    }
}

impl TransactionObserver for BridgeObserver {
    fn on_transactions_updated(&self, batch: Vec<RawTransaction>) {
        let _span = batch_span(batch.len()).entered();

        {
            let mut restored = self.restored.lock().unwrap();
            restored.extend(
                batch
                    .iter()
                    .filter(|t| t.state == TransactionState::Restored)
                    .cloned(),
            );
        }

        for transaction in batch {
            match transaction.state {
                TransactionState::Purchased | TransactionState::Failed => self.settle(transaction),
                TransactionState::Restored => {}
                TransactionState::Purchasing => {
                    tracing::trace!(product = %transaction.product_id(), "payment in progress");
                }
                TransactionState::Deferred => {
                    tracing::info!(
                        product = %transaction.product_id(),
                        "payment deferred, awaiting approval"
                    );
                }
                TransactionState::Unrecognized(code) => {
                    tracing::warn!(
                        product = %transaction.product_id(),
                        code,
                        "ignoring transaction in unrecognized state"
                    );
                }
            }
        }
    }

    fn on_restore_completed(&self) {
        let drained = std::mem::take(&mut *self.restored.lock().unwrap());
        self.metrics.restores_completed.inc();
        tracing::info!(count = drained.len(), "restore completed");

        let outcome = RestoreOutcome::Completed(drained.clone());
        self.publish(TransactionEvent::RestoreFinished(outcome.clone()));
        if !self.restores.resolve(&RestoreSlot, outcome) {
            tracing::debug!("restore completed with no caller waiting");
        }

        for transaction in &drained {
            self.queue.finish_transaction(transaction);
            self.metrics.transactions_finished.inc();
        }
    }

    fn on_restore_failed(&self, error: PlatformError) {
        self.metrics.restores_failed.inc();
        if self.clear_restore_buffer_on_failure {
            let discarded = std::mem::take(&mut *self.restored.lock().unwrap());
            tracing::warn!(error = %error, discarded = discarded.len(), "restore failed");
        } else {
            tracing::warn!(error = %error, "restore failed");
        }

        let outcome = RestoreOutcome::Failed(error.message);
        self.publish(TransactionEvent::RestoreFinished(outcome.clone()));
        self.restores.resolve(&RestoreSlot, outcome);
    }
}
