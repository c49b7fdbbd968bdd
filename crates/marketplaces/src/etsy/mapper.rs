use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crosslist_catalog::Product;
use crosslist_core::{Cents, Marketplace};
use crosslist_listings::{MarketplacePayload, SchemaMapper, ValidationError, Violations};

use super::config::EtsyConfig;

const MAX_TITLE_CHARS: usize = 140;
const MIN_PRICE: Cents = Cents(20);
const MAX_QUANTITY: u32 = 999;
const MAX_IMAGES: usize = 10;

/// Listing write plus the images to attach after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtsyListing {
    /// Set when the product is already listed on Etsy; the listing is then
    /// updated in place.
    pub listing_id: Option<String>,
    pub draft: EtsyDraft,
    pub images: Vec<String>,
}

/// Body of Etsy's create/update listing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtsyDraft {
    pub quantity: u32,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub who_made: String,
    pub when_made: String,
    pub is_supply: bool,
    pub taxonomy_id: u64,
    pub shipping_profile_id: u64,
}

pub struct EtsyMapper {
    config: Arc<EtsyConfig>,
}

impl EtsyMapper {
    pub fn new(config: Arc<EtsyConfig>) -> Self {
        Self { config }
    }

    fn taxonomy_id(&self, product: &Product) -> Option<u64> {
        product
            .category()
            .and_then(|c| self.config.taxonomy_ids.get(&c.trim().to_lowercase()).copied())
            .or(self.config.default_taxonomy_id)
    }
}

impl SchemaMapper for EtsyMapper {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Etsy
    }

    fn to_listing_payload(&self, product: &Product) -> Result<MarketplacePayload, ValidationError> {
        let mut v = Violations::new();

        let title = product.title().trim();
        v.require(!title.is_empty(), "title", "must not be blank");
        v.require(
            title.chars().count() <= MAX_TITLE_CHARS,
            "title",
            format!("must be at most {MAX_TITLE_CHARS} characters"),
        );
        let description = product.description().trim();
        v.require(!description.is_empty(), "description", "must not be blank");
        v.require(
            product.price() >= MIN_PRICE,
            "price",
            format!("must be at least {MIN_PRICE} USD"),
        );
        v.require(
            (1..=MAX_QUANTITY).contains(&product.quantity()),
            "quantity",
            format!("must be between 1 and {MAX_QUANTITY}"),
        );
        let count = product.images().len();
        v.require(
            (1..=MAX_IMAGES).contains(&count),
            "images",
            format!("between 1 and {MAX_IMAGES} images are required"),
        );
        for (i, reference) in product.images().iter().enumerate() {
            v.require(!reference.trim().is_empty(), &format!("images[{i}]"), "image reference is blank");
        }

        let taxonomy_id = self.taxonomy_id(product);
        v.require(
            taxonomy_id.is_some(),
            "taxonomy_id",
            "no Etsy taxonomy mapped and no default taxonomy configured",
        );
        v.require(
            self.config.shipping_profile_id.is_some(),
            "shipping_profile_id",
            "shipping profile is not configured",
        );

        let listing_id = product
            .listing_status(Marketplace::Etsy)
            .external_id()
            .map(str::to_string);
        let listing = EtsyListing {
            listing_id: listing_id.clone(),
            draft: EtsyDraft {
                quantity: product.quantity(),
                title: title.to_string(),
                description: description.to_string(),
                price: product.price().as_units(),
                who_made: "someone_else".to_string(),
                when_made: "2020_2023".to_string(),
                is_supply: true,
                taxonomy_id: taxonomy_id.unwrap_or_default(),
                shipping_profile_id: self.config.shipping_profile_id.unwrap_or_default(),
            },
            images: product.images().iter().map(|i| i.trim().to_string()).collect(),
        };

        let listing = v.finish(Marketplace::Etsy, listing)?;
        let reference = listing_id.unwrap_or_else(|| "new".to_string());
        MarketplacePayload::encode(Marketplace::Etsy, reference, &listing)
            .map_err(|e| ValidationError::single(Marketplace::Etsy, "payload", e.to_string()))
    }
}
