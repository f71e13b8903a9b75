//! Nullable product catalog.

use std::collections::BTreeSet;
use std::sync::Mutex;

use iap_store::{CatalogError, ProductCatalog, ProductRequestDelegate};
use iap_types::{Product, ProductId};

/// How the catalog answers the next requests.
#[derive(Clone, Debug)]
pub enum NullCatalogMode {
    /// Answer with the known products among the requested ids.
    Respond,
    /// Fail with a transport error carrying this message.
    Fail(String),
    /// Drop the delegate without answering.
    Drop,
}

/// An in-memory catalog that answers synchronously.
pub struct NullCatalog {
    products: Vec<Product>,
    mode: Mutex<NullCatalogMode>,
    requests: Mutex<Vec<BTreeSet<ProductId>>>,
}

impl NullCatalog {
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products,
            mode: Mutex::new(NullCatalogMode::Respond),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A USD product fixture.
    pub fn product(id: &str, price_micros: i64) -> Product {
        Product {
            id: ProductId::new(id),
            title: id.to_string(),
            description: format!("{id} description"),
            price_micros,
            formatted_price: format!("${:.2}", price_micros as f64 / 1_000_000.0),
            currency_code: "USD".into(),
        }
    }

    pub fn set_mode(&self, mode: NullCatalogMode) {
        *self.mode.lock().unwrap() = mode;
    }

    /// Every id set requested so far (for assertions).
    pub fn requests(&self) -> Vec<BTreeSet<ProductId>> {
        self.requests.lock().unwrap().clone()
    }
}

impl ProductCatalog for NullCatalog {
    fn request_products(
        &self,
        ids: &BTreeSet<ProductId>,
        delegate: Box<dyn ProductRequestDelegate>,
    ) {
        self.requests.lock().unwrap().push(ids.clone());
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            NullCatalogMode::Respond => {
                let found = self
                    .products
                    .iter()
                    .filter(|p| ids.contains(&p.id))
                    .cloned()
                    .collect();
                delegate.did_receive(found);
            }
            NullCatalogMode::Fail(message) => delegate.did_fail(CatalogError::Transport(message)),
            NullCatalogMode::Drop => drop(delegate),
        }
    }
}
