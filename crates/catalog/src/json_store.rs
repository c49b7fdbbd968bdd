//! Catalog persisted as a pretty-printed JSON array on disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crosslist_core::ProductId;

use crate::product::Product;
use crate::store::{upsert, CatalogError, CatalogStore};

/// File-backed catalog.
///
/// Every `save` rewrites the whole file through a sibling temp file and a
/// rename, so a crash mid-write leaves the previous catalog intact. A missing
/// file reads as an empty catalog.
#[derive(Debug)]
pub struct JsonFileCatalogStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<Product>, CatalogError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CatalogError::Storage(format!(
                    "reading {}: {e}",
                    self.path.display()
                )));
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            CatalogError::Storage(format!("parsing {}: {e}", self.path.display()))
        })
    }

    fn write_all(&self, products: &[Product]) -> Result<(), CatalogError> {
        let json = serde_json::to_vec_pretty(products)
            .map_err(|e| CatalogError::Storage(format!("serializing catalog: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| CatalogError::Storage(format!("writing {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            CatalogError::Storage(format!("replacing {}: {e}", self.path.display()))
        })?;

        tracing::debug!(path = %self.path.display(), products = products.len(), "catalog written");
        Ok(())
    }
}

impl CatalogStore for JsonFileCatalogStore {
    fn load(&self) -> Result<Vec<Product>, CatalogError> {
        self.read_all()
    }

    fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.read_all()?
            .into_iter()
            .find(|p| p.id() == id)
            .ok_or(CatalogError::NotFound(id))
    }

    fn save(&self, product: Product) -> Result<(), CatalogError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut products = self.read_all()?;
        upsert(&mut products, product);
        self.write_all(&products)
    }
}
