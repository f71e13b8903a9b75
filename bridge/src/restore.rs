//! Restore coordinator: redeliver everything the user already owns.

use std::sync::Arc;

use iap_store::{PaymentQueue, ReceiptSource, ReceiptValidator};
use iap_types::{Purchase, PurchaseError};

use crate::convert::restored_purchase;
use crate::metrics::BridgeMetrics;
use crate::observer::{BridgeObserver, RestoreOutcome};
use crate::receipt::validate_receipt;
use crate::registry::RegisterError;

pub struct RestoreCoordinator {
    queue: Arc<dyn PaymentQueue>,
    observer: Arc<BridgeObserver>,
    receipts: Arc<dyn ReceiptSource>,
    metrics: Arc<BridgeMetrics>,
}

impl RestoreCoordinator {
    pub fn new(
        queue: Arc<dyn PaymentQueue>,
        observer: Arc<BridgeObserver>,
        receipts: Arc<dyn ReceiptSource>,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            queue,
            observer,
            receipts,
            metrics,
        }
    }

    /// Restore completed transactions.
    ///
    /// A store failure resolves to `RestoreFailed`, never to a partial list.
    /// With a validator, one verification covers the whole set and a
    /// rejection resolves to `Ok(None)`. An observer that was shut down
    /// fails it with `BillingUnavailable` before the store is asked.
    pub async fn restore(
        &self,
        validator: Option<&dyn ReceiptValidator>,
    ) -> Result<Option<Vec<Purchase>>, PurchaseError> {
        let finished = self
            .observer
            .await_restore()
            .map_err(|e| match e {
                RegisterError::Pending => PurchaseError::RequestPending("restore".into()),
                RegisterError::Closed => PurchaseError::BillingUnavailable,
            })?;

        self.queue.restore_completed_transactions();
        tracing::info!("restore requested");

        let outcome = finished.await.map_err(|_| {
            tracing::warn!("bridge disconnected before restore finished");
            PurchaseError::BillingUnavailable
        })?;

        let transactions = match outcome {
            RestoreOutcome::Completed(transactions) => transactions,
            RestoreOutcome::Failed(message) => return Err(PurchaseError::RestoreFailed(message)),
        };

        let purchases: Vec<Purchase> = transactions.iter().filter_map(restored_purchase).collect();
        let skipped = transactions.len() - purchases.len();
        if skipped > 0 {
            tracing::warn!(skipped, "restored transactions without id or date were dropped");
        }

        let Some(validator) = validator else {
            return Ok(Some(purchases));
        };

        if validate_receipt(self.receipts.as_ref(), validator, "", "", "").await {
            Ok(Some(purchases))
        } else {
            self.metrics.validations_rejected.inc();
            tracing::warn!(count = purchases.len(), "restore receipt rejected");
            Ok(None)
        }
    }
}
