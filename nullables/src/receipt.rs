//! Nullable receipt source and validator.

use async_trait::async_trait;
use iap_store::{ReceiptSource, ReceiptValidator, VerificationRequest};
use std::sync::Mutex;

/// A receipt source returning fixed bytes (or nothing).
pub struct NullReceiptSource {
    receipt: Option<Vec<u8>>,
}

impl NullReceiptSource {
    pub fn with_receipt(bytes: Vec<u8>) -> Self {
        Self {
            receipt: Some(bytes),
        }
    }

    pub fn empty() -> Self {
        Self { receipt: None }
    }
}

impl ReceiptSource for NullReceiptSource {
    fn receipt_data(&self) -> Option<Vec<u8>> {
        self.receipt.clone()
    }
}

/// A validator with a fixed verdict that records every request.
pub struct NullValidator {
    verdict: bool,
    requests: Mutex<Vec<VerificationRequest>>,
}

impl NullValidator {
    pub fn accepting() -> Self {
        Self {
            verdict: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            verdict: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// All verification requests received (for assertions).
    pub fn requests(&self) -> Vec<VerificationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReceiptValidator for NullValidator {
    async fn verify(&self, request: &VerificationRequest) -> bool {
        self.requests.lock().unwrap().push(request.clone());
        self.verdict
    }
}
