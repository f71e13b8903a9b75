//! Nullable payment queue: records calls and delivers scripted updates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use iap_store::{
    ObserverId, Payment, PaymentQueue, PlatformError, RawTransaction, TransactionObserver,
};
use iap_types::ProductId;
use tokio::sync::Notify;

/// A test payment queue that records calls instead of talking to a store.
///
/// Updates reach observers either on explicit command ([`deliver`],
/// [`complete_restore`], [`fail_restore`]) or from scripts registered with
/// [`respond_with`], which play synchronously inside `submit_payment`, i.e.
/// before the submitting caller regains control.
///
/// [`deliver`]: NullPaymentQueue::deliver
/// [`complete_restore`]: NullPaymentQueue::complete_restore
/// [`fail_restore`]: NullPaymentQueue::fail_restore
/// [`respond_with`]: NullPaymentQueue::respond_with
pub struct NullPaymentQueue {
    observers: Mutex<HashMap<u64, Arc<dyn TransactionObserver>>>,
    next_observer: AtomicU64,
    removals: AtomicU64,
    submitted: Mutex<Vec<Payment>>,
    finished: Mutex<Vec<RawTransaction>>,
    restore_requests: AtomicU64,
    scripts: Mutex<HashMap<ProductId, Vec<RawTransaction>>>,
    changed: Notify,
}

impl NullPaymentQueue {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(HashMap::new()),
            next_observer: AtomicU64::new(1),
            removals: AtomicU64::new(0),
            submitted: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
            restore_requests: AtomicU64::new(0),
            scripts: Mutex::new(HashMap::new()),
            changed: Notify::new(),
        }
    }

    /// Answer the next payment for `product` with `batch`.
    pub fn respond_with(&self, product: &str, batch: Vec<RawTransaction>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(ProductId::new(product), batch);
    }

    fn current_observers(&self) -> Vec<Arc<dyn TransactionObserver>> {
        self.observers.lock().unwrap().values().cloned().collect()
    }

    /// Deliver a batch to every registered observer.
    pub fn deliver(&self, batch: Vec<RawTransaction>) {
        for observer in self.current_observers() {
            observer.on_transactions_updated(batch.clone());
        }
    }

    pub fn complete_restore(&self) {
        for observer in self.current_observers() {
            observer.on_restore_completed();
        }
    }

    pub fn fail_restore(&self, error: PlatformError) {
        for observer in self.current_observers() {
            observer.on_restore_failed(error.clone());
        }
    }

    /// All payments submitted so far.
    pub fn submitted(&self) -> Vec<Payment> {
        self.submitted.lock().unwrap().clone()
    }

    /// All transactions finished so far, in call order.
    pub fn finished(&self) -> Vec<RawTransaction> {
        self.finished.lock().unwrap().clone()
    }

    pub fn restore_requests(&self) -> u64 {
        self.restore_requests.load(Ordering::SeqCst)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().unwrap().len()
    }

    /// Number of `remove_observer` calls that removed something.
    pub fn removals(&self) -> u64 {
        self.removals.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` payments have been submitted.
    pub async fn wait_for_submissions(&self, count: usize) {
        loop {
            let changed = self.changed.notified();
            if self.submitted.lock().unwrap().len() >= count {
                return;
            }
            changed.await;
        }
    }

    /// Wait until at least `count` restores have been requested.
    pub async fn wait_for_restore_requests(&self, count: u64) {
        loop {
            let changed = self.changed.notified();
            if self.restore_requests() >= count {
                return;
            }
            changed.await;
        }
    }
}

impl Default for NullPaymentQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentQueue for NullPaymentQueue {
    fn submit_payment(&self, payment: Payment) {
        let script = self.scripts.lock().unwrap().remove(&payment.product_id);
        self.submitted.lock().unwrap().push(payment);
        self.changed.notify_waiters();
        if let Some(batch) = script {
            self.deliver(batch);
        }
    }

    fn restore_completed_transactions(&self) {
        self.restore_requests.fetch_add(1, Ordering::SeqCst);
        self.changed.notify_waiters();
    }

    fn finish_transaction(&self, transaction: &RawTransaction) {
        self.finished.lock().unwrap().push(transaction.clone());
    }

    fn add_observer(&self, observer: Arc<dyn TransactionObserver>) -> ObserverId {
        let id = self.next_observer.fetch_add(1, Ordering::SeqCst);
        self.observers.lock().unwrap().insert(id, observer);
        ObserverId(id)
    }

    fn remove_observer(&self, id: ObserverId) {
        if self.observers.lock().unwrap().remove(&id.0).is_some() {
            self.removals.fetch_add(1, Ordering::SeqCst);
        }
    }
}
