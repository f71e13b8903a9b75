//! Device receipt access and caller-supplied receipt verification.

use async_trait::async_trait;

/// Source of the device's purchase receipt bytes.
pub trait ReceiptSource: Send + Sync {
    /// `None` when the device holds no receipt yet.
    fn receipt_data(&self) -> Option<Vec<u8>>;
}

/// Everything a verifier needs to check one purchase (or one restore).
///
/// For a restore, `product_id` and `transaction_id` are empty: one
/// verification covers the whole restored set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationRequest {
    pub receipt_base64: String,
    /// Opaque caller data forwarded to the verification server.
    pub server_payload: String,
    pub product_id: String,
    pub transaction_id: String,
}

/// A pluggable, usually server-side, receipt check.
#[async_trait]
pub trait ReceiptValidator: Send + Sync {
    /// `true` accepts the purchase.
    async fn verify(&self, request: &VerificationRequest) -> bool;
}
