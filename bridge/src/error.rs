use thiserror::Error;

/// Errors from setting the bridge up, as opposed to the per-operation
/// [`iap_types::PurchaseError`].
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
