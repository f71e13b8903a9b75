//! Completed purchase record handed back to callers.

use serde::{Deserialize, Serialize};

use crate::{ProductId, PurchaseState, Timestamp, TransactionId};

/// A purchase built from a terminal or restored store transaction.
///
/// Never mutated after creation; owned by the caller once returned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Platform transaction id.
    pub id: TransactionId,
    pub product_id: ProductId,
    pub state: PurchaseState,
    /// Transaction date (UTC).
    pub purchased_at: Timestamp,
    /// Opaque payload the caller attached to the payment, if any.
    pub developer_payload: Option<String>,
}

impl Purchase {
    pub fn is_active(&self) -> bool {
        self.state.grants_entitlement()
    }
}
