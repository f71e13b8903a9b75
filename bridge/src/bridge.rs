//! The caller-facing bridge object.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use iap_store::{ObserverId, PaymentQueue, ProductCatalog, ReceiptSource, ReceiptValidator};
use iap_types::{ItemType, Product, ProductId, Purchase, PurchaseError};
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::BridgeConfig;
use crate::metrics::BridgeMetrics;
use crate::observer::{BridgeObserver, TransactionEvent};
use crate::products::ProductInfoRequester;
use crate::purchase::PurchaseCoordinator;
use crate::restore::RestoreCoordinator;
use crate::tracing_spans::{fetch_products_span, purchase_span, restore_span};

enum Connection {
    Idle,
    Connected {
        observer: Arc<BridgeObserver>,
        id: ObserverId,
    },
    Disposed,
}

/// Request/response facade over a push-style store queue.
///
/// Owns the transaction observer for as long as it is connected. Construct
/// one per store queue, call [`connect`](Self::connect) once at startup and
/// [`dispose`](Self::dispose) once at shutdown.
pub struct StoreBridge {
    queue: Arc<dyn PaymentQueue>,
    receipts: Arc<dyn ReceiptSource>,
    products: ProductInfoRequester,
    config: BridgeConfig,
    metrics: Arc<BridgeMetrics>,
    updates: broadcast::Sender<TransactionEvent>,
    connection: Mutex<Connection>,
}

impl StoreBridge {
    pub fn new(
        queue: Arc<dyn PaymentQueue>,
        catalog: Arc<dyn ProductCatalog>,
        receipts: Arc<dyn ReceiptSource>,
        config: BridgeConfig,
    ) -> Self {
        let (updates, _) = broadcast::channel(config.update_channel_capacity.max(1));
        Self {
            queue,
            receipts,
            products: ProductInfoRequester::new(catalog),
            config,
            metrics: Arc::new(BridgeMetrics::new()),
            updates,
            connection: Mutex::new(Connection::Idle),
        }
    }

    /// Register the transaction observer with the store queue.
    ///
    /// Connecting an already connected bridge is a no-op. A disposed bridge
    /// cannot reconnect.
    pub fn connect(&self) -> Result<(), PurchaseError> {
        let mut connection = self.connection.lock().unwrap();
        match *connection {
            Connection::Connected { .. } => Ok(()),
            Connection::Disposed => Err(PurchaseError::BillingUnavailable),
            Connection::Idle => {
                let observer = Arc::new(BridgeObserver::new(
                    self.queue.clone(),
                    self.updates.clone(),
                    self.metrics.clone(),
                    self.config.clear_restore_buffer_on_failure,
                ));
                let id = self.queue.add_observer(observer.clone());
                tracing::info!(observer = %id, "bridge connected");
                *connection = Connection::Connected { observer, id };
                Ok(())
            }
        }
    }

    /// Remove the observer from the queue and fail every pending request
    /// with `BillingUnavailable`. No-op when not connected.
    pub fn disconnect(&self) {
        let mut connection = self.connection.lock().unwrap();
        if !matches!(*connection, Connection::Connected { .. }) {
            tracing::debug!("disconnect on a bridge that is not connected");
            return;
        }
        if let Connection::Connected { observer, id } =
            std::mem::replace(&mut *connection, Connection::Idle)
        {
            self.queue.remove_observer(id);
            observer.shutdown();
            tracing::info!(observer = %id, "bridge disconnected");
        }
    }

    /// Disconnect for good. Safe to call any number of times.
    ///
    /// Runs on drop, so a poisoned lock is recovered rather than unwrapped.
    pub fn dispose(&self) {
        let mut connection = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *connection, Connection::Disposed) {
            Connection::Connected { observer, id } => {
                self.queue.remove_observer(id);
                observer.shutdown();
                tracing::info!(observer = %id, "bridge disposed");
            }
            Connection::Idle => tracing::debug!("bridge disposed while idle"),
            Connection::Disposed => {}
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.connection.lock().unwrap(), Connection::Connected { .. })
    }

    fn observer(&self) -> Result<Arc<BridgeObserver>, PurchaseError> {
        match &*self.connection.lock().unwrap() {
            Connection::Connected { observer, .. } => Ok(observer.clone()),
            _ => Err(PurchaseError::BillingUnavailable),
        }
    }

    /// Look up products in the catalog.
    pub async fn fetch_products<I>(
        &self,
        item_type: ItemType,
        ids: I,
    ) -> Result<Vec<Product>, PurchaseError>
    where
        I: IntoIterator,
        I::Item: Into<ProductId>,
    {
        self.observer()?;
        let ids: BTreeSet<ProductId> = ids.into_iter().map(Into::into).collect();
        self.products
            .fetch(&ids)
            .instrument(fetch_products_span(item_type.as_str(), ids.len()))
            .await
    }

    /// Restore everything the user owns.
    pub async fn get_purchases(
        &self,
        item_type: ItemType,
        validator: Option<&dyn ReceiptValidator>,
    ) -> Result<Option<Vec<Purchase>>, PurchaseError> {
        let coordinator = RestoreCoordinator::new(
            self.queue.clone(),
            self.observer()?,
            self.receipts.clone(),
            self.metrics.clone(),
        );
        coordinator
            .restore(validator)
            .instrument(restore_span(item_type.as_str()))
            .await
    }

    /// Buy a product. `payload` travels with the payment and comes back as
    /// the purchase's developer payload.
    pub async fn purchase(
        &self,
        product_id: impl Into<ProductId>,
        item_type: ItemType,
        payload: Option<String>,
        validator: Option<&dyn ReceiptValidator>,
    ) -> Result<Option<Purchase>, PurchaseError> {
        let product_id = product_id.into();
        let span = purchase_span(product_id.as_str(), item_type.as_str());
        let coordinator = PurchaseCoordinator::new(
            self.queue.clone(),
            self.observer()?,
            self.receipts.clone(),
            self.metrics.clone(),
        );
        coordinator
            .purchase(product_id, payload, validator)
            .instrument(span)
            .await
    }

    /// Consumable settlement does not exist on this store.
    pub async fn consume_purchase(&self, purchase: &Purchase) -> Result<(), PurchaseError> {
        tracing::debug!(product = %purchase.product_id, "consume requested");
        Err(PurchaseError::UnsupportedOperation(
            "consuming purchases is not supported by this store".into(),
        ))
    }

    /// Every settlement and restore outcome, including ones no caller asked
    /// for. Slow receivers lag and lose the oldest events.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<TransactionEvent> {
        self.updates.subscribe()
    }

    /// Callers currently waiting on the store.
    pub fn pending_requests(&self) -> usize {
        match &*self.connection.lock().unwrap() {
            Connection::Connected { observer, .. } => observer.pending_requests(),
            _ => 0,
        }
    }

    pub fn metrics(&self) -> &BridgeMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl Drop for StoreBridge {
    fn drop(&mut self) {
        self.dispose();
    }
}
