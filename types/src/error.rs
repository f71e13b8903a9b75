//! Domain error taxonomy surfaced by every bridge operation.

use thiserror::Error;

/// The single error a purchase, restore or catalog operation resolves to.
///
/// Every variant is terminal; the bridge never retries.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PurchaseError {
    #[error("user cancelled the payment")]
    UserCancelled,

    #[error("payment parameters are invalid")]
    PaymentInvalid,

    #[error("payment is not allowed on this device")]
    PaymentNotAllowed,

    #[error("item is not available for purchase")]
    ItemUnavailable,

    #[error("billing is unavailable")]
    BillingUnavailable,

    #[error("store error: {0}")]
    GeneralError(String),

    #[error("restore failed: {0}")]
    RestoreFailed(String),

    #[error("product request failed: {0}")]
    ProductRequestFailed(String),

    #[error("no valid products in catalog response")]
    InvalidProduct,

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("a request for {0} is already pending")]
    RequestPending(String),
}

impl PurchaseError {
    /// Stable short code, used as a metrics/log label.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserCancelled => "user_cancelled",
            Self::PaymentInvalid => "payment_invalid",
            Self::PaymentNotAllowed => "payment_not_allowed",
            Self::ItemUnavailable => "item_unavailable",
            Self::BillingUnavailable => "billing_unavailable",
            Self::GeneralError(_) => "general_error",
            Self::RestoreFailed(_) => "restore_failed",
            Self::ProductRequestFailed(_) => "product_request_failed",
            Self::InvalidProduct => "invalid_product",
            Self::UnsupportedOperation(_) => "unsupported_operation",
            Self::RequestPending(_) => "request_pending",
        }
    }

    /// Whether the user backed out rather than something going wrong.
    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_detail() {
        let err = PurchaseError::RestoreFailed("network down".into());
        assert_eq!(err.to_string(), "restore failed: network down");
    }

    #[test]
    fn codes_are_distinct() {
        let all = [
            PurchaseError::UserCancelled,
            PurchaseError::PaymentInvalid,
            PurchaseError::PaymentNotAllowed,
            PurchaseError::ItemUnavailable,
            PurchaseError::BillingUnavailable,
            PurchaseError::GeneralError(String::new()),
            PurchaseError::RestoreFailed(String::new()),
            PurchaseError::ProductRequestFailed(String::new()),
            PurchaseError::InvalidProduct,
            PurchaseError::UnsupportedOperation(String::new()),
            PurchaseError::RequestPending(String::new()),
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), all.len());
    }
}
