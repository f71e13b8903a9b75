//! Keyed registry of one-shot completions.
//!
//! Correlates a caller's pending request (keyed by product id, or by the
//! single restore slot) with the event that answers it. Resolving removes the
//! entry, so a repeated delivery for the same key finds nothing and is a
//! no-op. Once closed, the registry refuses new requests.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("request already pending")]
    Pending,

    /// Nothing will ever answer: the registry was closed.
    #[error("registry closed")]
    Closed,
}

struct Entries<K, V> {
    senders: HashMap<K, oneshot::Sender<V>>,
    closed: bool,
}

pub struct PendingRequests<K, V> {
    pending: Mutex<Entries<K, V>>,
}

impl<K, V> PendingRequests<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Entries {
                senders: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// Add a pending request and return the handle that completes it.
    ///
    /// An entry whose receiver was dropped (the caller walked away) does not
    /// block a new registration; it is replaced.
    pub fn register(&self, key: K) -> Result<oneshot::Receiver<V>, RegisterError> {
        let mut pending = self.pending.lock().unwrap();
        if pending.closed {
            return Err(RegisterError::Closed);
        }
        if let Some(existing) = pending.senders.get(&key) {
            if !existing.is_closed() {
                return Err(RegisterError::Pending);
            }
        }
        let (tx, rx) = oneshot::channel();
        pending.senders.insert(key, tx);
        Ok(rx)
    }

    /// Complete the request for `key`, if any. Returns `true` if a live
    /// caller received `value`.
    pub fn resolve<Q>(&self, key: &Q, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let sender = self.pending.lock().unwrap().senders.remove(key);
        match sender {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.pending.lock().unwrap().senders.contains_key(key)
    }

    /// Drop every pending request and refuse new ones. Returns how many
    /// were dropped.
    pub fn close(&self) -> usize {
        let mut pending = self.pending.lock().unwrap();
        pending.closed = true;
        let count = pending.senders.len();
        pending.senders.clear();
        count
    }

    pub fn is_closed(&self) -> bool {
        self.pending.lock().unwrap().closed
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap().senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for PendingRequests<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_completes_matching_request() {
        let registry = PendingRequests::<String, u32>::new();
        let rx = registry.register("a".to_string()).unwrap();
        assert!(registry.resolve("a", 7));
        assert_eq!(rx.await.unwrap(), 7);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn second_resolve_is_noop() {
        let registry = PendingRequests::<String, u32>::new();
        let rx = registry.register("a".to_string()).unwrap();
        assert!(registry.resolve("a", 1));
        assert!(!registry.resolve("a", 2));
        assert_eq!(rx.await.unwrap(), 1);
    }

    #[test]
    fn other_keys_do_not_resolve() {
        let registry = PendingRequests::<String, u32>::new();
        let _rx = registry.register("a".to_string()).unwrap();
        assert!(!registry.resolve("b", 1));
        assert!(registry.contains("a"));
    }

    #[test]
    fn live_duplicate_is_rejected() {
        let registry = PendingRequests::<String, u32>::new();
        let _rx = registry.register("a".to_string()).unwrap();
        assert_eq!(
            registry.register("a".to_string()).unwrap_err(),
            RegisterError::Pending
        );
    }

    #[tokio::test]
    async fn abandoned_entry_is_replaced() {
        let registry = PendingRequests::<String, u32>::new();
        drop(registry.register("a".to_string()).unwrap());
        let rx = registry.register("a".to_string()).expect("abandoned entry replaced");
        assert!(registry.resolve("a", 3));
        assert_eq!(rx.await.unwrap(), 3);
    }

    #[test]
    fn resolve_to_abandoned_caller_reports_false() {
        let registry = PendingRequests::<String, u32>::new();
        drop(registry.register("a".to_string()).unwrap());
        assert!(!registry.resolve("a", 3));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn close_drops_every_receiver() {
        let registry = PendingRequests::<String, u32>::new();
        let rx1 = registry.register("a".to_string()).unwrap();
        let rx2 = registry.register("b".to_string()).unwrap();
        assert_eq!(registry.close(), 2);
        assert!(rx1.await.is_err());
        assert!(rx2.await.is_err());
    }

    #[test]
    fn closed_registry_refuses_new_requests() {
        let registry = PendingRequests::<String, u32>::new();
        assert_eq!(registry.close(), 0);
        assert!(registry.is_closed());
        assert_eq!(
            registry.register("a".to_string()).unwrap_err(),
            RegisterError::Closed
        );
        assert!(registry.is_empty());
        assert!(!registry.resolve("a", 1));
    }
}
