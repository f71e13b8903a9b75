//! Maps the platform's payment error codes onto [`PurchaseError`].

use iap_store::{PlatformError, PlatformErrorCode};
use iap_types::PurchaseError;

/// Classify the error attached to a failed transaction.
///
/// Anything the table does not name collapses into `GeneralError`, including
/// a failed transaction that carries no error at all.
pub fn classify(error: Option<&PlatformError>) -> PurchaseError {
    let Some(error) = error else {
        return PurchaseError::GeneralError("transaction failed without an error".into());
    };
    match error.code {
        PlatformErrorCode::PaymentCancelled => PurchaseError::UserCancelled,
        PlatformErrorCode::PaymentInvalid => PurchaseError::PaymentInvalid,
        PlatformErrorCode::PaymentNotAllowed => PurchaseError::PaymentNotAllowed,
        PlatformErrorCode::StoreProductNotAvailable => PurchaseError::ItemUnavailable,
        PlatformErrorCode::ClientInvalid => PurchaseError::BillingUnavailable,
        PlatformErrorCode::Unknown
        | PlatformErrorCode::CloudServicePermissionDenied
        | PlatformErrorCode::CloudServiceNetworkConnectionFailed
        | PlatformErrorCode::CloudServiceRevoked
        | PlatformErrorCode::Unrecognized(_) => PurchaseError::GeneralError(error.message.clone()),
    }
}
