//! Product info requester: one catalog request, one answer.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use iap_store::{CatalogError, ProductCatalog, ProductRequestDelegate};
use iap_types::{Product, ProductId, PurchaseError};
use tokio::sync::oneshot;

type CatalogResponse = Result<Vec<Product>, CatalogError>;

/// Delegate bound to exactly one outstanding catalog request.
struct ResponseHolder {
    tx: Mutex<Option<oneshot::Sender<CatalogResponse>>>,
}

impl ResponseHolder {
    fn new(tx: oneshot::Sender<CatalogResponse>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    fn complete(&self, response: CatalogResponse) {
        // First answer wins.
        if let Some(tx) = self.tx.lock().unwrap().take() {
            let _ = tx.send(response);
        }
    }
}

impl ProductRequestDelegate for ResponseHolder {
    fn did_receive(&self, products: Vec<Product>) {
        self.complete(Ok(products));
    }

    fn did_fail(&self, error: CatalogError) {
        self.complete(Err(error));
    }
}

/// Stateless: every call gets its own delegate, so concurrent fetches never
/// see each other's answers.
pub struct ProductInfoRequester {
    catalog: Arc<dyn ProductCatalog>,
}

impl ProductInfoRequester {
    pub fn new(catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { catalog }
    }

    /// Look up `ids` in the catalog.
    ///
    /// Products come back exactly as the catalog sent them; ids it does not
    /// know are simply missing. An empty answer is `InvalidProduct`.
    pub async fn fetch(&self, ids: &BTreeSet<ProductId>) -> Result<Vec<Product>, PurchaseError> {
        if ids.is_empty() {
            tracing::debug!("no product ids requested");
            return Err(PurchaseError::InvalidProduct);
        }

        let (tx, rx) = oneshot::channel();
        self.catalog
            .request_products(ids, Box::new(ResponseHolder::new(tx)));

        match rx.await {
            Ok(Ok(products)) if products.is_empty() => {
                tracing::info!(requested = ids.len(), "catalog returned no products");
                Err(PurchaseError::InvalidProduct)
            }
            Ok(Ok(products)) => {
                tracing::debug!(requested = ids.len(), returned = products.len(), "products fetched");
                Ok(products)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "catalog request failed");
                Err(PurchaseError::ProductRequestFailed(e.to_string()))
            }
            Err(_) => Err(PurchaseError::ProductRequestFailed(
                "catalog dropped the request without answering".into(),
            )),
        }
    }
}
