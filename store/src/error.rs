use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The platform's own payment error enumeration.
///
/// Numbering follows the store queue's error domain; codes the bridge does
/// not know are preserved in `Unrecognized`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformErrorCode {
    Unknown,
    ClientInvalid,
    PaymentCancelled,
    PaymentInvalid,
    PaymentNotAllowed,
    StoreProductNotAvailable,
    CloudServicePermissionDenied,
    CloudServiceNetworkConnectionFailed,
    CloudServiceRevoked,
    Unrecognized(i64),
}

impl PlatformErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Unknown,
            1 => Self::ClientInvalid,
            2 => Self::PaymentCancelled,
            3 => Self::PaymentInvalid,
            4 => Self::PaymentNotAllowed,
            5 => Self::StoreProductNotAvailable,
            6 => Self::CloudServicePermissionDenied,
            7 => Self::CloudServiceNetworkConnectionFailed,
            8 => Self::CloudServiceRevoked,
            other => Self::Unrecognized(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::ClientInvalid => 1,
            Self::PaymentCancelled => 2,
            Self::PaymentInvalid => 3,
            Self::PaymentNotAllowed => 4,
            Self::StoreProductNotAvailable => 5,
            Self::CloudServicePermissionDenied => 6,
            Self::CloudServiceNetworkConnectionFailed => 7,
            Self::CloudServiceRevoked => 8,
            Self::Unrecognized(code) => *code,
        }
    }
}

/// An error attached to a failed transaction or a failed restore.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("platform error {code:?}: {message}")]
pub struct PlatformError {
    pub code: PlatformErrorCode,
    pub message: String,
}

impl PlatformError {
    pub fn new(code: PlatformErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Transport-level failure of a catalog request.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Transport(String),

    #[error("catalog service unavailable")]
    Unavailable,
}
