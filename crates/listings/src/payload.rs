use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crosslist_core::Marketplace;

/// Marketplace-specific listing document produced by a [`SchemaMapper`].
///
/// `reference` is the marketplace-side key the publisher addresses (eBay SKU,
/// existing Etsy listing id, ...). `document` is the mapper's typed payload
/// in JSON form; only the matching publisher interprets it.
///
/// [`SchemaMapper`]: crate::SchemaMapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplacePayload {
    pub marketplace: Marketplace,
    pub reference: String,
    pub document: serde_json::Value,
}

impl MarketplacePayload {
    pub fn encode<T: Serialize>(
        marketplace: Marketplace,
        reference: impl Into<String>,
        document: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            marketplace,
            reference: reference.into(),
            document: serde_json::to_value(document)?,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.document)
    }
}
