//! Conversion of raw platform transactions into domain purchases.

use iap_store::{RawTransaction, TransactionState};
use iap_types::{Purchase, PurchaseState};

pub fn purchase_state(state: TransactionState) -> PurchaseState {
    match state {
        TransactionState::Purchasing => PurchaseState::Purchasing,
        TransactionState::Purchased => PurchaseState::Purchased,
        TransactionState::Failed => PurchaseState::Failed,
        TransactionState::Restored => PurchaseState::Restored,
        TransactionState::Deferred => PurchaseState::Deferred,
        TransactionState::Unrecognized(_) => PurchaseState::Unknown,
    }
}

/// Build a [`Purchase`] from a transaction.
///
/// `None` while the transaction is still in flight, or if the store has not
/// assigned an id or a date yet.
pub fn purchase_from_transaction(transaction: &RawTransaction) -> Option<Purchase> {
    let state = purchase_state(transaction.state);
    if !state.is_terminal() {
        return None;
    }
    let id = transaction.transaction_id.clone()?;
    let purchased_at = transaction.date?;
    Some(Purchase {
        id,
        product_id: transaction.product_id().clone(),
        state,
        purchased_at,
        developer_payload: transaction.payment.application_username.clone(),
    })
}

/// Build a [`Purchase`] from a restored record, preferring the transaction it
/// restores over the restore record itself.
pub fn restored_purchase(transaction: &RawTransaction) -> Option<Purchase> {
    let source = transaction.original.as_deref().unwrap_or(transaction);
    purchase_from_transaction(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use iap_store::Payment;
    use iap_types::{ProductId, Timestamp, TransactionId};

    fn tx(id: Option<&str>, state: TransactionState, date: Option<u64>) -> RawTransaction {
        RawTransaction {
            transaction_id: id.map(TransactionId::from),
            payment: Payment::new(ProductId::new("coffee.small"))
                .with_username(Some("user-7".into())),
            state,
            date: date.map(Timestamp::from_millis),
            error: None,
            original: None,
        }
    }

    #[test]
    fn converts_purchased_transaction() {
        let purchase =
            purchase_from_transaction(&tx(Some("t1"), TransactionState::Purchased, Some(5)))
                .expect("complete transaction converts");
        assert_eq!(purchase.id.as_str(), "t1");
        assert_eq!(purchase.product_id.as_str(), "coffee.small");
        assert_eq!(purchase.state, PurchaseState::Purchased);
        assert_eq!(purchase.purchased_at, Timestamp::from_millis(5));
        assert_eq!(purchase.developer_payload.as_deref(), Some("user-7"));
    }

    #[test]
    fn missing_id_or_date_yields_none() {
        assert!(purchase_from_transaction(&tx(None, TransactionState::Purchasing, Some(1))).is_none());
        assert!(purchase_from_transaction(&tx(Some("t"), TransactionState::Purchased, None)).is_none());
    }

    #[test]
    fn in_flight_transaction_yields_none() {
        for state in [
            TransactionState::Purchasing,
            TransactionState::Deferred,
            TransactionState::Unrecognized(7),
        ] {
            assert!(purchase_from_transaction(&tx(Some("t1"), state, Some(1))).is_none());
        }
    }

    #[test]
    fn restored_prefers_original() {
        let mut restored = tx(Some("r1"), TransactionState::Restored, Some(9));
        restored.original = Some(Box::new(tx(Some("t0"), TransactionState::Purchased, Some(1))));
        let purchase = restored_purchase(&restored).unwrap();
        assert_eq!(purchase.id.as_str(), "t0");
        assert_eq!(purchase.state, PurchaseState::Purchased);
    }

    #[test]
    fn restored_without_original_uses_record() {
        let purchase = restored_purchase(&tx(Some("r1"), TransactionState::Restored, Some(9))).unwrap();
        assert_eq!(purchase.id.as_str(), "r1");
        assert_eq!(purchase.state, PurchaseState::Restored);
    }

    #[test]
    fn unrecognized_state_is_unknown() {
        assert_eq!(purchase_state(TransactionState::Unrecognized(7)), PurchaseState::Unknown);
    }
}
