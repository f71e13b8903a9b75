//! Raw platform transaction records as the store queue delivers them.

use iap_types::{ProductId, Timestamp, TransactionId};
use serde::{Deserialize, Serialize};

use crate::PlatformError;

/// The state the store reports for a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    Purchasing,
    Purchased,
    Failed,
    Restored,
    Deferred,
    /// A state code this bridge does not know about.
    Unrecognized(i64),
}

impl TransactionState {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Purchasing,
            1 => Self::Purchased,
            2 => Self::Failed,
            3 => Self::Restored,
            4 => Self::Deferred,
            other => Self::Unrecognized(other),
        }
    }

    /// `Purchased` and `Failed` settle on arrival; `Restored` settles when the
    /// restore completes.
    pub fn settles_on_arrival(&self) -> bool {
        matches!(self, Self::Purchased | Self::Failed)
    }
}

/// A payment request submitted to the queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub product_id: ProductId,
    /// Opaque caller string carried through to the resulting transaction.
    pub application_username: Option<String>,
}

impl Payment {
    pub fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            application_username: None,
        }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.application_username = username;
        self
    }
}

/// One transaction record from a queue update batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Absent while the transaction is still `Purchasing`.
    pub transaction_id: Option<TransactionId>,
    pub payment: Payment,
    pub state: TransactionState,
    pub date: Option<Timestamp>,
    /// Set for `Failed` transactions.
    pub error: Option<PlatformError>,
    /// The transaction this one renews or restores, if any.
    pub original: Option<Box<RawTransaction>>,
}

impl RawTransaction {
    pub fn product_id(&self) -> &ProductId {
        &self.payment.product_id
    }
}
