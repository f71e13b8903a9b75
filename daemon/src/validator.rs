//! Local receipt validators for the sandbox CLI.

use async_trait::async_trait;
use iap_store::{ReceiptValidator, VerificationRequest};
use iap_utils::decode_receipt;
use serde::Deserialize;

/// How `--validate` checks receipts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ValidateMode {
    /// Accept every receipt.
    Accept,
    /// Reject every receipt.
    Reject,
    /// Accept when the sandbox receipt lists the transaction.
    Receipt,
}

#[derive(Deserialize)]
struct SandboxReceipt {
    transactions: Vec<String>,
}

/// Stands in for a verification server.
pub struct LocalValidator {
    mode: ValidateMode,
}

impl LocalValidator {
    pub fn new(mode: ValidateMode) -> Self {
        Self { mode }
    }

    fn receipt_lists(request: &VerificationRequest) -> bool {
        let Some(bytes) = decode_receipt(&request.receipt_base64) else {
            tracing::warn!("receipt is not valid base64");
            return false;
        };
        let receipt: SandboxReceipt = match serde_json::from_slice(&bytes) {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(error = %e, "receipt is not a sandbox receipt");
                return false;
            }
        };
        // A restore carries no transaction id: any non-empty receipt passes.
        if request.transaction_id.is_empty() {
            return !receipt.transactions.is_empty();
        }
        receipt.transactions.contains(&request.transaction_id)
    }
}

#[async_trait]
impl ReceiptValidator for LocalValidator {
    async fn verify(&self, request: &VerificationRequest) -> bool {
        let verdict = match self.mode {
            ValidateMode::Accept => true,
            ValidateMode::Reject => false,
            ValidateMode::Receipt => Self::receipt_lists(request),
        };
        tracing::debug!(
            mode = ?self.mode,
            product = %request.product_id,
            payload = %request.server_payload,
            verdict,
            "local receipt check"
        );
        verdict
    }
}
