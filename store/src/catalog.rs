//! Remote product catalog request.

use std::collections::BTreeSet;

use iap_types::{Product, ProductId};

use crate::CatalogError;

/// Receives the single answer to one catalog request.
///
/// A delegate is bound to exactly one outstanding request; the catalog calls
/// one of the two methods at most once.
pub trait ProductRequestDelegate: Send + Sync {
    /// Products the catalog knows among the requested ids. Unknown ids are
    /// simply absent.
    fn did_receive(&self, products: Vec<Product>);

    fn did_fail(&self, error: CatalogError);
}

pub trait ProductCatalog: Send + Sync {
    /// Start a catalog lookup; the answer goes to `delegate`.
    fn request_products(
        &self,
        ids: &BTreeSet<ProductId>,
        delegate: Box<dyn ProductRequestDelegate>,
    );
}
