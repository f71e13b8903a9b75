//! Sandbox store configuration with TOML file support.

use std::collections::HashMap;

use iap_types::{Product, ProductId, MICROS_PER_UNIT};
use serde::{Deserialize, Serialize};

use crate::SandboxError;

/// What the sandbox does with a payment for a given product.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxOutcome {
    #[default]
    Approve,
    /// The user dismissed the payment sheet.
    Cancel,
    Invalid,
    NotAllowed,
    Unavailable,
    ClientInvalid,
    /// Ask-to-buy: deferred first, approved after another delay.
    Defer,
    /// Failed with an unknown platform error.
    Error,
}

/// A catalog entry served by the sandbox.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxProduct {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price_micros: i64,
    #[serde(default = "default_currency_code")]
    pub currency_code: String,
}

impl SandboxProduct {
    pub fn to_product(&self) -> Product {
        let title = if self.title.is_empty() {
            self.id.clone()
        } else {
            self.title.clone()
        };
        Product {
            id: ProductId::new(self.id.as_str()),
            title,
            description: self.description.clone(),
            price_micros: self.price_micros,
            formatted_price: format_price(self.price_micros, &self.currency_code),
            currency_code: self.currency_code.clone(),
        }
    }
}

/// `"USD 1.99"`; the sandbox does not localize.
fn format_price(micros: i64, currency_code: &str) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let micros = micros.unsigned_abs();
    let units = micros / MICROS_PER_UNIT as u64;
    let cents = (micros % MICROS_PER_UNIT as u64) / 10_000;
    format!("{currency_code} {sign}{units}.{cents:02}")
}

/// Configuration for a [`crate::SandboxStore`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default)]
    pub products: Vec<SandboxProduct>,

    /// Product ids the user already owns when the sandbox starts.
    #[serde(default)]
    pub owned: Vec<String>,

    /// Per-product payment outcome. Unlisted products are approved.
    #[serde(default)]
    pub outcomes: HashMap<String, SandboxOutcome>,

    /// Delay before each notification the sandbox delivers.
    #[serde(default = "default_delivery_delay_ms")]
    pub delivery_delay_ms: u64,

    /// Restored transactions per update batch.
    #[serde(default = "default_restore_batch_size")]
    pub restore_batch_size: usize,

    /// Fail every restore after delivering its transactions.
    #[serde(default)]
    pub restore_fails: bool,

    /// Fail every catalog request.
    #[serde(default)]
    pub catalog_unavailable: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_currency_code() -> String {
    "USD".to_string()
}

fn default_delivery_delay_ms() -> u64 {
    20
}

fn default_restore_batch_size() -> usize {
    2
}

// ── Impl ───────────────────────────────────────────────────────────────

impl SandboxConfig {
    pub fn from_toml_file(path: &str) -> Result<Self, SandboxError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, SandboxError> {
        let config: Self = toml::from_str(s).map_err(|e| SandboxError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SandboxError> {
        if self.restore_batch_size == 0 {
            return Err(SandboxError::Config(
                "restore_batch_size must be at least 1".into(),
            ));
        }
        for id in &self.owned {
            if !self.products.iter().any(|p| &p.id == id) {
                return Err(SandboxError::Config(format!(
                    "owned product {id} is not in the catalog"
                )));
            }
        }
        Ok(())
    }

    pub fn outcome_for(&self, product_id: &ProductId) -> SandboxOutcome {
        self.outcomes
            .get(product_id.as_str())
            .copied()
            .unwrap_or_default()
    }

    pub fn knows(&self, product_id: &ProductId) -> bool {
        self.products.iter().any(|p| p.id == product_id.as_str())
    }

    /// A small coffee-shop catalog for demos and tests.
    pub fn demo() -> Self {
        let product = |id: &str, title: &str, price_micros| SandboxProduct {
            id: id.into(),
            title: title.into(),
            description: format!("{title}, freshly brewed"),
            price_micros,
            currency_code: default_currency_code(),
        };
        Self {
            products: vec![
                product("coffee.small", "Small coffee", 1_990_000),
                product("coffee.large", "Large coffee", 2_990_000),
                product("pro.unlock", "Pro features", 9_990_000),
            ],
            ..Self::default()
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            owned: Vec::new(),
            outcomes: HashMap::new(),
            delivery_delay_ms: default_delivery_delay_ms(),
            restore_batch_size: default_restore_batch_size(),
            restore_fails: false,
            catalog_unavailable: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = SandboxConfig::from_toml_str("").unwrap();
        assert_eq!(config.delivery_delay_ms, 20);
        assert_eq!(config.restore_batch_size, 2);
        assert!(config.products.is_empty());
    }

    #[test]
    fn parses_products_and_outcomes() {
        let toml = r#"
            owned = ["pro.unlock"]
            delivery_delay_ms = 0

            [[products]]
            id = "pro.unlock"
            price_micros = 9990000

            [outcomes]
            "coffee.small" = "cancel"
            "coffee.large" = "not_allowed"
        "#;
        let config = SandboxConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.products[0].currency_code, "USD");
        assert_eq!(
            config.outcome_for(&ProductId::new("coffee.small")),
            SandboxOutcome::Cancel
        );
        assert_eq!(
            config.outcome_for(&ProductId::new("coffee.large")),
            SandboxOutcome::NotAllowed
        );
        assert_eq!(
            config.outcome_for(&ProductId::new("pro.unlock")),
            SandboxOutcome::Approve
        );
    }

    #[test]
    fn owned_products_must_exist() {
        let err = SandboxConfig::from_toml_str(r#"owned = ["ghost"]"#).unwrap_err();
        assert!(matches!(err, SandboxError::Config(m) if m.contains("ghost")));
    }

    #[test]
    fn zero_batch_size_rejected() {
        assert!(SandboxConfig::from_toml_str("restore_batch_size = 0").is_err());
    }

    #[test]
    fn formatted_price() {
        let product = SandboxConfig::demo().products[0].to_product();
        assert_eq!(product.formatted_price, "USD 1.99");
        assert_eq!(product.title, "Small coffee");
        assert_eq!(format_price(-500_000, "EUR"), "EUR -0.50");
    }
}
