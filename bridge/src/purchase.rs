//! Purchase coordinator: one payment in, one outcome out.

use std::sync::Arc;
use std::time::Instant;

use iap_store::{Payment, PaymentQueue, ReceiptSource, ReceiptValidator};
use iap_types::{ProductId, Purchase, PurchaseError};

use crate::classifier::classify;
use crate::convert::purchase_from_transaction;
use crate::metrics::BridgeMetrics;
use crate::observer::BridgeObserver;
use crate::registry::RegisterError;
use crate::receipt::validate_receipt;

pub struct PurchaseCoordinator {
    queue: Arc<dyn PaymentQueue>,
    observer: Arc<BridgeObserver>,
    receipts: Arc<dyn ReceiptSource>,
    metrics: Arc<BridgeMetrics>,
}

impl PurchaseCoordinator {
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

    /// Buy `product_id` and wait for the store's verdict.
    ///
    /// Resolves to `Ok(None)` when a validator is supplied and rejects the
    /// receipt; rejection is not an error. A second purchase of the same
    /// product while the first is still waiting fails with `RequestPending`;
    /// an observer that was shut down fails it with `BillingUnavailable`
    /// before anything is submitted.
    pub async fn purchase(
        &self,
        product_id: ProductId,
        payload: Option<String>,
        validator: Option<&dyn ReceiptValidator>,
    ) -> Result<Option<Purchase>, PurchaseError> {
        let settled = self
            .observer
            .await_settlement(product_id.clone())
            .map_err(|e| match e {
                RegisterError::Pending => PurchaseError::RequestPending(product_id.to_string()),
                RegisterError::Closed => PurchaseError::BillingUnavailable,
            })?;

        let started = Instant::now();
        self.queue
            .submit_payment(Payment::new(product_id.clone()).with_username(payload.clone()));
        self.metrics.payments_submitted.inc();
        tracing::info!(product = %product_id, "payment submitted");

        let settlement = settled.await.map_err(|_| {
            tracing::warn!(product = %product_id, "bridge disconnected before settlement");
            PurchaseError::BillingUnavailable
        })?;
        self.metrics
            .settlement_latency_ms
            .observe(started.elapsed().as_secs_f64() * 1_000.0);

        if !settlement.success {
            let error = classify(settlement.transaction.error.as_ref());
            tracing::info!(product = %product_id, error = %error, "purchase failed");
            return Err(error);
        }

        let purchase = purchase_from_transaction(&settlement.transaction).ok_or_else(|| {
            PurchaseError::GeneralError("settled transaction has no id or date".into())
        })?;

        let Some(validator) = validator else {
            tracing::info!(product = %product_id, transaction = %purchase.id, "purchase completed");
            return Ok(Some(purchase));
        };

        let accepted = validate_receipt(
            self.receipts.as_ref(),
            validator,
            payload.as_deref().unwrap_or_default(),
            product_id.as_str(),
            purchase.id.as_str(),
        )
        .await;
        if accepted {
            tracing::info!(product = %product_id, transaction = %purchase.id, "purchase validated");
            Ok(Some(purchase))
        } else {
            self.metrics.validations_rejected.inc();
            tracing::warn!(product = %product_id, transaction = %purchase.id, "receipt rejected");
            Ok(None)
        }
    }
}
