//! Purchase state classification.

use serde::{Deserialize, Serialize};

/// The state of a purchase as classified by the bridge.
///
/// This is not a strict state machine: it records whatever the store reported
/// for the transaction a [`crate::Purchase`] was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PurchaseState {
    /// Payment sheet is up; the store has not decided yet.
    Purchasing,
    /// The store charged the user.
    Purchased,
    /// The store rejected or the user cancelled the payment.
    Failed,
    /// A previously completed purchase delivered by a restore.
    Restored,
    /// Awaiting an external approval (e.g. parental "ask to buy").
    Deferred,
    /// A state code the bridge does not recognise.
    Unknown,
}

impl PurchaseState {
    /// Whether this state triggers settlement (acknowledgement) with the store.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Purchased | Self::Failed | Self::Restored)
    }

    /// Whether the user holds the product in this state.
    pub fn grants_entitlement(&self) -> bool {
        matches!(self, Self::Purchased | Self::Restored)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchasing => "purchasing",
            Self::Purchased => "purchased",
            Self::Failed => "failed",
            Self::Restored => "restored",
            Self::Deferred => "deferred",
            Self::Unknown => "unknown",
        }
    }
}
