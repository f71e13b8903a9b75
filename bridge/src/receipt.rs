//! Receipt validation shared by the purchase and restore coordinators.

use iap_store::{ReceiptSource, ReceiptValidator, VerificationRequest};
use iap_utils::encode_receipt;

/// Run `validator` over the device receipt.
///
/// A device without a receipt cannot be validated and counts as rejected.
pub async fn validate_receipt(
    receipts: &dyn ReceiptSource,
    validator: &dyn ReceiptValidator,
    server_payload: &str,
    product_id: &str,
    transaction_id: &str,
) -> bool {
    let Some(bytes) = receipts.receipt_data() else {
        tracing::warn!(product = product_id, "no receipt on device, treating as rejected");
        return false;
    };
    let request = VerificationRequest {
        receipt_base64: encode_receipt(&bytes),
        server_payload: server_payload.to_string(),
        product_id: product_id.to_string(),
        transaction_id: transaction_id.to_string(),
    };
    let accepted = validator.verify(&request).await;
    tracing::debug!(product = product_id, transaction = transaction_id, accepted, "receipt validated");
    accepted
}
