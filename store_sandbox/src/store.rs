//! The sandbox store: payment queue, catalog and receipt source in one.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use iap_store::{
    CatalogError, ObserverId, Payment, PaymentQueue, PlatformError, PlatformErrorCode,
    ProductCatalog, ProductRequestDelegate, RawTransaction, ReceiptSource, TransactionObserver,
    TransactionState,
};
use iap_types::{ProductId, Timestamp, TransactionId};
use serde::Serialize;
use tokio::runtime::Handle;

use crate::config::{SandboxConfig, SandboxOutcome};
use crate::SandboxError;

struct Inner {
    config: SandboxConfig,
    observers: Mutex<HashMap<u64, Arc<dyn TransactionObserver>>>,
    next_observer: AtomicU64,
    next_transaction: AtomicU64,
    /// Completed purchases, in purchase order. Restores replay these.
    ledger: Mutex<Vec<RawTransaction>>,
    /// Delivered terminal transactions nobody has finished yet.
    unfinished: Mutex<HashMap<TransactionId, RawTransaction>>,
}

/// Receipt body: the ids of every completed purchase.
#[derive(Serialize)]
struct SandboxReceipt<'a> {
    transactions: Vec<&'a str>,
}

/// An in-process store that behaves like a platform payment queue.
///
/// Every notification is delivered from a spawned task after
/// `delivery_delay_ms`, never on the caller's stack. Terminal transactions
/// stay unfinished until [`PaymentQueue::finish_transaction`] is called and
/// are redelivered to every observer added while they are outstanding.
#[derive(Clone)]
pub struct SandboxStore {
    inner: Arc<Inner>,
    runtime: Handle,
}

impl SandboxStore {
    /// Create a sandbox bound to the current tokio runtime.
    pub fn new(config: SandboxConfig) -> Result<Self, SandboxError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| SandboxError::NoRuntime)?;

        let now = Timestamp::now();
        let ledger = config
            .owned
            .iter()
            .enumerate()
            .map(|(i, id)| RawTransaction {
                transaction_id: Some(TransactionId::new(format!("owned-{}", i + 1))),
                payment: Payment::new(ProductId::new(id.as_str())),
                state: TransactionState::Purchased,
                date: Some(now),
                error: None,
                original: None,
            })
            .collect();

        tracing::debug!(
            products = config.products.len(),
            owned = config.owned.len(),
            "sandbox store created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                observers: Mutex::new(HashMap::new()),
                next_observer: AtomicU64::new(1),
                next_transaction: AtomicU64::new(1),
                ledger: Mutex::new(ledger),
                unfinished: Mutex::new(HashMap::new()),
            }),
            runtime,
        })
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.inner.config
    }

    /// Completed purchases, oldest first.
    pub fn ledger(&self) -> Vec<RawTransaction> {
        self.inner.ledger.lock().unwrap().clone()
    }

    /// Delivered transactions still waiting for `finish_transaction`.
    pub fn unfinished_count(&self) -> usize {
        self.inner.unfinished.lock().unwrap().len()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().unwrap().len()
    }
}

impl Inner {
    fn delay(&self) -> Duration {
        Duration::from_millis(self.config.delivery_delay_ms)
    }

    fn observers(&self) -> Vec<Arc<dyn TransactionObserver>> {
        self.observers.lock().unwrap().values().cloned().collect()
    }

    fn next_id(&self, prefix: &str) -> TransactionId {
        let n = self.next_transaction.fetch_add(1, Ordering::SeqCst);
        TransactionId::new(format!("{prefix}-{n}"))
    }

    async fn deliver(&self, batch: Vec<RawTransaction>) {
        tokio::time::sleep(self.delay()).await;
        for transaction in &batch {
            if let Some(id) = &transaction.transaction_id {
                if matches!(
                    transaction.state,
                    TransactionState::Purchased | TransactionState::Failed | TransactionState::Restored
                ) {
                    self.unfinished
                        .lock()
                        .unwrap()
                        .insert(id.clone(), transaction.clone());
                }
            }
        }
        for observer in self.observers() {
            observer.on_transactions_updated(batch.clone());
        }
    }

    fn pending(&self, payment: &Payment, state: TransactionState) -> RawTransaction {
        RawTransaction {
            transaction_id: None,
            payment: payment.clone(),
            state,
            date: None,
            error: None,
            original: None,
        }
    }

    fn complete(&self, payment: &Payment) -> RawTransaction {
        let transaction = RawTransaction {
            transaction_id: Some(self.next_id("sandbox")),
            payment: payment.clone(),
            state: TransactionState::Purchased,
            date: Some(Timestamp::now()),
            error: None,
            original: None,
        };
        self.ledger.lock().unwrap().push(transaction.clone());
        transaction
    }

    fn fail(&self, payment: &Payment, code: PlatformErrorCode, message: &str) -> RawTransaction {
        RawTransaction {
            transaction_id: Some(self.next_id("failed")),
            error: Some(PlatformError::new(code, message)),
            ..self.pending(payment, TransactionState::Failed)
        }
    }

    async fn process_payment(&self, payment: Payment) {
        let outcome = if self.config.knows(&payment.product_id) {
            self.config.outcome_for(&payment.product_id)
        } else {
            SandboxOutcome::Unavailable
        };
        tracing::debug!(product = %payment.product_id, ?outcome, "sandbox processing payment");

        self.deliver(vec![self.pending(&payment, TransactionState::Purchasing)])
            .await;

        let verdict = match outcome {
            SandboxOutcome::Approve => self.complete(&payment),
            SandboxOutcome::Defer => {
                self.deliver(vec![self.pending(&payment, TransactionState::Deferred)])
                    .await;
                self.complete(&payment)
            }
            SandboxOutcome::Cancel => {
                self.fail(&payment, PlatformErrorCode::PaymentCancelled, "user cancelled")
            }
            SandboxOutcome::Invalid => {
                self.fail(&payment, PlatformErrorCode::PaymentInvalid, "payment invalid")
            }
            SandboxOutcome::NotAllowed => self.fail(
                &payment,
                PlatformErrorCode::PaymentNotAllowed,
                "payments are disabled on this device",
            ),
            SandboxOutcome::Unavailable => self.fail(
                &payment,
                PlatformErrorCode::StoreProductNotAvailable,
                "product not available in this storefront",
            ),
            SandboxOutcome::ClientInvalid => self.fail(
                &payment,
                PlatformErrorCode::ClientInvalid,
                "client is not allowed to purchase",
            ),
            SandboxOutcome::Error => {
                self.fail(&payment, PlatformErrorCode::Unknown, "sandbox store error")
            }
        };
        self.deliver(vec![verdict]).await;
    }

    async fn process_restore(&self) {
        let restored: Vec<RawTransaction> = self
            .ledger
            .lock()
            .unwrap()
            .clone()
            .into_iter()
            .map(|original| RawTransaction {
                transaction_id: Some(self.next_id("restore")),
                payment: original.payment.clone(),
                state: TransactionState::Restored,
                date: Some(Timestamp::now()),
                error: None,
                original: Some(Box::new(original)),
            })
            .collect();
        tracing::debug!(count = restored.len(), "sandbox restoring transactions");

        for chunk in restored.chunks(self.config.restore_batch_size) {
            self.deliver(chunk.to_vec()).await;
        }

        tokio::time::sleep(self.delay()).await;
        if self.config.restore_fails {
            let error = PlatformError::new(
                PlatformErrorCode::CloudServiceNetworkConnectionFailed,
                "sandbox restore failed",
            );
            for observer in self.observers() {
                observer.on_restore_failed(error.clone());
            }
        } else {
            for observer in self.observers() {
                observer.on_restore_completed();
            }
        }
    }

    async fn answer_catalog(&self, ids: BTreeSet<ProductId>, delegate: Box<dyn ProductRequestDelegate>) {
        tokio::time::sleep(self.delay()).await;
        if self.config.catalog_unavailable {
            delegate.did_fail(CatalogError::Unavailable);
            return;
        }
        let products = self
            .config
            .products
            .iter()
            .filter(|p| ids.contains(p.id.as_str()))
            .map(|p| p.to_product())
            .collect();
        delegate.did_receive(products);
    }
}

impl PaymentQueue for SandboxStore {
    fn submit_payment(&self, payment: Payment) {
        let inner = self.inner.clone();
        self.runtime
            .spawn(async move { inner.process_payment(payment).await });
    }

    fn restore_completed_transactions(&self) {
        let inner = self.inner.clone();
        self.runtime.spawn(async move { inner.process_restore().await });
    }

    fn finish_transaction(&self, transaction: &RawTransaction) {
        let Some(id) = &transaction.transaction_id else {
            tracing::warn!(product = %transaction.product_id(), "finish on a transaction without id");
            return;
        };
        if self.inner.unfinished.lock().unwrap().remove(id).is_none() {
            tracing::debug!(transaction = %id, "transaction was already finished");
        }
    }

    fn add_observer(&self, observer: Arc<dyn TransactionObserver>) -> ObserverId {
        let id = self.inner.next_observer.fetch_add(1, Ordering::SeqCst);
        self.inner
            .observers
            .lock()
            .unwrap()
            .insert(id, observer.clone());

        let outstanding: Vec<RawTransaction> = self
            .inner
            .unfinished
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.state.settles_on_arrival())
            .cloned()
            .collect();
        if !outstanding.is_empty() {
            tracing::info!(count = outstanding.len(), "redelivering unfinished transactions");
            let delay = self.inner.delay();
            self.runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                observer.on_transactions_updated(outstanding);
            });
        }
        ObserverId(id)
    }

    fn remove_observer(&self, id: ObserverId) {
        self.inner.observers.lock().unwrap().remove(&id.0);
    }
}

impl ProductCatalog for SandboxStore {
    fn request_products(
        &self,
        ids: &BTreeSet<ProductId>,
        delegate: Box<dyn ProductRequestDelegate>,
    ) {
        let inner = self.inner.clone();
        let ids = ids.clone();
        self.runtime
            .spawn(async move { inner.answer_catalog(ids, delegate).await });
    }
}

impl ReceiptSource for SandboxStore {
    fn receipt_data(&self) -> Option<Vec<u8>> {
        let ledger = self.inner.ledger.lock().unwrap();
        if ledger.is_empty() {
            return None;
        }
        let receipt = SandboxReceipt {
            transactions: ledger
                .iter()
                .filter_map(|t| t.transaction_id.as_ref().map(TransactionId::as_str))
                .collect(),
        };
        serde_json::to_vec(&receipt).ok()
    }
}
