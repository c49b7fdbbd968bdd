//! Writes listing outcomes back into the catalog.
//!
//! Branches of one publish call finish concurrently and each rewrites the
//! same product, so every read-modify-write of a listing entry goes through
//! one recorder lock.

use std::sync::{Arc, Mutex, PoisonError};

use crosslist_catalog::{CatalogError, CatalogStore, ListingStatus, Product};
use crosslist_core::{Marketplace, ProductId};

pub struct ListingRecorder {
    store: Arc<dyn CatalogStore>,
    write: Mutex<()>,
}

impl ListingRecorder {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            write: Mutex::new(()),
        }
    }

    pub fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.store.get(id)
    }

    /// Set the listing status and return the one it replaced.
    pub fn set_status(
        &self,
        id: ProductId,
        marketplace: Marketplace,
        status: ListingStatus,
    ) -> Result<ListingStatus, CatalogError> {
        let _write = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let mut product = self.store.get(id)?;
        let previous = product.listing_status(marketplace);
        product.set_listing_status(marketplace, status.clone());
        self.store.save(product)?;

        tracing::debug!(
            product_id = %id,
            marketplace = %marketplace,
            from = previous.label(),
            to = status.label(),
            "listing status changed"
        );
        Ok(previous)
    }

    /// Mark the listing `Pending`. The returned guard restores the prior
    /// status unless [`PendingListing::finish`] records a final one.
    pub fn begin(self: &Arc<Self>, id: ProductId, marketplace: Marketplace) -> Result<PendingListing, CatalogError> {
        let product = {
            let _write = self.write.lock().unwrap_or_else(PoisonError::into_inner);
            let product = self.store.get(id)?;
            let mut pending = product.clone();
            pending.set_listing_status(marketplace, ListingStatus::Pending);
            self.store.save(pending)?;
            product
        };
        tracing::debug!(product_id = %id, marketplace = %marketplace, "listing pending");

        Ok(PendingListing {
            recorder: Arc::clone(self),
            prior: product.listing_status(marketplace),
            product,
            marketplace,
            settled: false,
        })
    }
}

impl std::fmt::Debug for ListingRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingRecorder").finish_non_exhaustive()
    }
}

/// A listing currently marked `Pending`.
#[derive(Debug)]
pub struct PendingListing {
    recorder: Arc<ListingRecorder>,
    /// The product as it was before it went pending.
    product: Product,
    marketplace: Marketplace,
    prior: ListingStatus,
    settled: bool,
}

impl PendingListing {
    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn prior(&self) -> &ListingStatus {
        &self.prior
    }

    /// Record the final status. A failure keeps the listing id the product
    /// had before this attempt.
    pub fn finish(mut self, status: ListingStatus) -> Result<(), CatalogError> {
        self.settled = true;
        let status = status.keeping_listing_of(&self.prior);
        self.recorder
            .set_status(self.product.id(), self.marketplace, status)
            .map(|_| ())
    }

    /// Put the prior status back now instead of on drop.
    pub fn revert(self) {}
}

impl Drop for PendingListing {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let id = self.product.id();
        match self.recorder.set_status(id, self.marketplace, self.prior.clone()) {
            Ok(_) => tracing::info!(
                product_id = %id,
                marketplace = %self.marketplace,
                status = self.prior.label(),
                "publish abandoned; listing status restored"
            ),
            Err(err) => tracing::error!(
                product_id = %id,
                marketplace = %self.marketplace,
                error = %err,
                "could not restore listing status"
            ),
        }
    }
}
