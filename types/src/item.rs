//! Product item types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of item a caller is asking about.
///
/// Kept for parity with multi-store callers. The transaction queue this
/// workspace bridges has a single product namespace, so the item type only
/// tags tracing spans and selects the item kind on the sandbox CLI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Consumable,
    NonConsumable,
    Subscription,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consumable => "consumable",
            Self::NonConsumable => "non_consumable",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "consumable" => Ok(Self::Consumable),
            "non_consumable" | "non-consumable" | "nonconsumable" => Ok(Self::NonConsumable),
            "subscription" | "subs" => Ok(Self::Subscription),
            other => Err(format!("unknown item type: {other}")),
        }
    }
}
