use crosslist_catalog::Product;
use crosslist_core::Marketplace;

use crate::payload::MarketplacePayload;
use crate::validation::ValidationError;

/// Maps a catalog product into one marketplace's listing schema.
///
/// Implementations are pure: the same product always yields an identical
/// payload, and no IO happens here.
pub trait SchemaMapper: Send + Sync {
    fn marketplace(&self) -> Marketplace;

    fn to_listing_payload(&self, product: &Product) -> Result<MarketplacePayload, ValidationError>;
}
