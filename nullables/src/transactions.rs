//! Raw transaction fixtures.

use iap_store::{Payment, PlatformError, PlatformErrorCode, RawTransaction, TransactionState};
use iap_types::{ProductId, Timestamp, TransactionId};

/// Fixed date stamped on every fixture transaction that has one.
pub const FIXTURE_DATE_MS: u64 = 1_700_000_000_000;

fn base(product: &str, state: TransactionState) -> RawTransaction {
    RawTransaction {
        transaction_id: None,
        payment: Payment::new(ProductId::new(product)),
        state,
        date: None,
        error: None,
        original: None,
    }
}

fn dated(product: &str, id: &str, state: TransactionState) -> RawTransaction {
    RawTransaction {
        transaction_id: Some(TransactionId::new(id)),
        date: Some(Timestamp::from_millis(FIXTURE_DATE_MS)),
        ..base(product, state)
    }
}

pub fn purchasing(product: &str) -> RawTransaction {
    base(product, TransactionState::Purchasing)
}

pub fn deferred(product: &str) -> RawTransaction {
    base(product, TransactionState::Deferred)
}

pub fn with_state(product: &str, state: TransactionState) -> RawTransaction {
    base(product, state)
}

pub fn purchased(product: &str, id: &str) -> RawTransaction {
    dated(product, id, TransactionState::Purchased)
}

/// A purchased transaction carrying a developer payload.
pub fn purchased_with_payload(product: &str, id: &str, payload: &str) -> RawTransaction {
    let mut tx = purchased(product, id);
    tx.payment.application_username = Some(payload.to_string());
    tx
}

pub fn failed(product: &str, code: PlatformErrorCode) -> RawTransaction {
    RawTransaction {
        error: Some(PlatformError::new(code, format!("{code:?}"))),
        ..base(product, TransactionState::Failed)
    }
}

/// A restore record `restore_id` for the earlier purchase `original_id`.
pub fn restored(product: &str, restore_id: &str, original_id: &str) -> RawTransaction {
    RawTransaction {
        original: Some(Box::new(purchased(product, original_id))),
        ..dated(product, restore_id, TransactionState::Restored)
    }
}
