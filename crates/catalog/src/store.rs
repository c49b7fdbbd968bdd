use std::sync::{Arc, RwLock};

use thiserror::Error;

use crosslist_core::ProductId;

use crate::product::Product;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found: {0}")]
    NotFound(ProductId),

    #[error("catalog storage error: {0}")]
    Storage(String),
}

/// Catalog persistence boundary.
///
/// `save` is an upsert: an existing product keeps its position in the
/// catalog, a new one is appended.
pub trait CatalogStore: Send + Sync {
    /// All products in catalog order.
    fn load(&self) -> Result<Vec<Product>, CatalogError>;

    fn get(&self, id: ProductId) -> Result<Product, CatalogError>;

    fn save(&self, product: Product) -> Result<(), CatalogError>;
}

impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn load(&self) -> Result<Vec<Product>, CatalogError> {
        (**self).load()
    }

    fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        (**self).get(id)
    }

    fn save(&self, product: Product) -> Result<(), CatalogError> {
        (**self).save(product)
    }
}

/// Insert or replace `product` in an ordered product list.
pub(crate) fn upsert(products: &mut Vec<Product>, product: Product) {
    match products.iter_mut().find(|p| p.id() == product.id()) {
        Some(existing) => *existing = product,
        None => products.push(product),
    }
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    products: RwLock<Vec<Product>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut list = Vec::new();
        for product in products {
            upsert(&mut list, product);
        }
        Self {
            products: RwLock::new(list),
        }
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn load(&self) -> Result<Vec<Product>, CatalogError> {
        let products = self
            .products
            .read()
            .map_err(|_| CatalogError::Storage("lock poisoned".to_string()))?;
        Ok(products.clone())
    }

    fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        let products = self
            .products
            .read()
            .map_err(|_| CatalogError::Storage("lock poisoned".to_string()))?;
        products
            .iter()
            .find(|p| p.id() == id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))
    }

    fn save(&self, product: Product) -> Result<(), CatalogError> {
        let mut products = self
            .products
            .write()
            .map_err(|_| CatalogError::Storage("lock poisoned".to_string()))?;
        upsert(&mut products, product);
        Ok(())
    }
}
