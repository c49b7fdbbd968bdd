use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crosslist_catalog::Product;
use crosslist_core::Marketplace;
use crosslist_listings::{MarketplacePayload, SchemaMapper, ValidationError, Violations};

use super::config::EbayConfig;
use crate::images;

const MAX_TITLE_CHARS: usize = 80;
const MAX_IMAGES: usize = 24;

/// Inventory item plus the offer that lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EbayListing {
    pub sku: String,
    pub inventory_item: InventoryItem,
    pub offer: Offer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub availability: Availability,
    pub condition: String,
    pub product: ItemProduct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub ship_to_location_availability: ShipToLocationAvailability,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipToLocationAvailability {
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemProduct {
    pub title: String,
    pub description: String,
    pub aspects: BTreeMap<String, Vec<String>>,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub sku: String,
    pub marketplace_id: String,
    pub format: String,
    pub available_quantity: u32,
    pub category_id: String,
    pub listing_description: String,
    pub listing_policies: ListingPolicies,
    pub pricing_summary: PricingSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPolicies {
    pub fulfillment_policy_id: String,
    pub payment_policy_id: String,
    pub return_policy_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSummary {
    pub price: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: String,
}

pub struct EbayMapper {
    config: Arc<EbayConfig>,
}

impl EbayMapper {
    pub fn new(config: Arc<EbayConfig>) -> Self {
        Self { config }
    }

    /// eBay SKU for a product. Stable across publishes so a retry updates
    /// the same inventory item.
    pub fn sku(product: &Product) -> String {
        format!("CL-{}", product.id())
    }

    fn category_id(&self, product: &Product) -> Option<String> {
        product
            .category()
            .and_then(|c| self.config.category_ids.get(&c.trim().to_lowercase()))
            .or(self.config.default_category_id.as_ref())
            .cloned()
    }
}

impl SchemaMapper for EbayMapper {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Ebay
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
        v.require(!product.price().is_zero(), "price", "must be greater than zero");
        v.require(product.quantity() >= 1, "quantity", "must be at least 1");

        let count = product.images().len();
        v.require(count >= 1, "images", "at least one image is required");
        v.require(count <= MAX_IMAGES, "images", format!("at most {MAX_IMAGES} images are allowed"));
        let mut image_urls = Vec::with_capacity(count);
        for (i, reference) in product.images().iter().enumerate() {
            match images::absolute_url(reference, self.config.public_base_url.as_ref()) {
                Ok(url) => image_urls.push(url.to_string()),
                Err(reason) => v.push(format!("images[{i}]"), reason),
            }
        }

        let category_id = self.category_id(product);
        v.require(
            category_id.is_some(),
            "category",
            "no eBay category mapped and no default category configured",
        );

        let policies = &self.config.policies;
        for (field, id) in [
            ("listingPolicies.fulfillmentPolicyId", &policies.fulfillment_policy_id),
            ("listingPolicies.paymentPolicyId", &policies.payment_policy_id),
            ("listingPolicies.returnPolicyId", &policies.return_policy_id),
        ] {
            v.require(id.is_some(), field, "business policy is not configured");
        }

        let sku = Self::sku(product);
        let listing = EbayListing {
            sku: sku.clone(),
            inventory_item: InventoryItem {
                availability: Availability {
                    ship_to_location_availability: ShipToLocationAvailability {
                        quantity: product.quantity(),
                    },
                },
                condition: "NEW".to_string(),
                product: ItemProduct {
                    title: title.to_string(),
                    description: description.to_string(),
                    aspects: BTreeMap::new(),
                    image_urls,
                },
            },
            offer: Offer {
                sku: sku.clone(),
                marketplace_id: self.config.marketplace_id.clone(),
                format: "FIXED_PRICE".to_string(),
                available_quantity: product.quantity(),
                category_id: category_id.unwrap_or_default(),
                listing_description: description.to_string(),
                listing_policies: ListingPolicies {
                    fulfillment_policy_id: policies.fulfillment_policy_id.clone().unwrap_or_default(),
                    payment_policy_id: policies.payment_policy_id.clone().unwrap_or_default(),
                    return_policy_id: policies.return_policy_id.clone().unwrap_or_default(),
                },
                pricing_summary: PricingSummary {
                    price: Amount {
                        value: product.price().to_string(),
                        currency: "USD".to_string(),
                    },
                },
            },
        };

        let listing = v.finish(Marketplace::Ebay, listing)?;
        MarketplacePayload::encode(Marketplace::Ebay, sku, &listing)
            .map_err(|e| ValidationError::single(Marketplace::Ebay, "payload", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebay::config::{EbayEnvironment, EbayPolicies};
    use crosslist_auth::ClientCredentials;
    use crosslist_catalog::NewProduct;
    use crosslist_core::Cents;
    use proptest::prelude::*;
    use url::Url;

    fn config() -> EbayConfig {
        let mut config = EbayConfig::new(ClientCredentials::new("id", "secret"), "RuName", EbayEnvironment::Sandbox);
        config.policies = EbayPolicies {
            fulfillment_policy_id: Some("fp-1".to_string()),
            payment_policy_id: Some("pp-1".to_string()),
            return_policy_id: Some("rp-1".to_string()),
        };
        config.category_ids.insert("mugs".to_string(), "20625".to_string());
        config.default_category_id = Some("9355".to_string());
        config.public_base_url = Some(Url::parse("https://shop.example.com").unwrap());
        config
    }

    fn mapper() -> EbayMapper {
        EbayMapper::new(Arc::new(config()))
    }

    fn mug() -> NewProduct {
        NewProduct {
            title: "Speckled mug".to_string(),
            description: "Hand-thrown stoneware".to_string(),
            price: Cents(2450),
            cost: Cents(800),
            quantity: 3,
            images: vec!["/static/uploads/mug.jpg".to_string()],
            category: Some("Mugs".to_string()),
        }
    }

    #[test]
    fn maps_a_valid_product() {
        let product = Product::new(mug()).unwrap();
        let payload = mapper().to_listing_payload(&product).unwrap();
        let listing: EbayListing = payload.decode().unwrap();

        assert_eq!(payload.reference, format!("CL-{}", product.id()));
        assert_eq!(listing.offer.sku, listing.sku);
        assert_eq!(listing.offer.category_id, "20625");
        assert_eq!(listing.offer.pricing_summary.price.value, "24.50");
        assert_eq!(listing.offer.available_quantity, 3);
        assert_eq!(
            listing.inventory_item.product.image_urls,
            vec!["https://shop.example.com/static/uploads/mug.jpg".to_string()]
        );
        assert_eq!(payload.document["offer"]["listingPolicies"]["paymentPolicyId"], "pp-1");
        assert_eq!(
            payload.document["inventoryItem"]["availability"]["shipToLocationAvailability"]["quantity"],
            3
        );
    }

    #[test]
    fn unmapped_category_falls_back_to_the_default() {
        let product = Product::new(NewProduct {
            category: Some("lamps".to_string()),
            ..mug()
        })
        .unwrap();
        let listing: EbayListing = mapper().to_listing_payload(&product).unwrap().decode().unwrap();
        assert_eq!(listing.offer.category_id, "9355");
    }

    #[test]
    fn reports_every_violation() {
        let mut config = config();
        config.default_category_id = None;
        config.policies.return_policy_id = None;
        let product = Product::new(NewProduct {
            title: "x".repeat(81),
            price: Cents(0),
            quantity: 0,
            images: vec![],
            category: Some("lamps".to_string()),
            ..mug()
        })
        .unwrap();

        let err = EbayMapper::new(Arc::new(config)).to_listing_payload(&product).unwrap_err();
        for field in ["title", "price", "quantity", "images", "category", "listingPolicies.returnPolicyId"] {
            assert!(err.has_field(field), "missing violation for {field}: {err}");
        }
        assert!(!err.has_field("description"));
    }

    #[test]
    fn rejects_too_many_and_unresolvable_images() {
        let product = Product::new(NewProduct {
            images: (0..25).map(|i| format!("https://cdn.example.com/{i}.jpg")).collect(),
            ..mug()
        })
        .unwrap();
        assert!(mapper().to_listing_payload(&product).unwrap_err().has_field("images"));

        let mut config = config();
        config.public_base_url = None;
        let product = Product::new(NewProduct {
            images: vec!["https://cdn.example.com/a.jpg".to_string(), "/static/uploads/b.jpg".to_string()],
            ..mug()
        })
        .unwrap();
        let err = EbayMapper::new(Arc::new(config)).to_listing_payload(&product).unwrap_err();
        assert!(err.has_field("images[1]"));
        assert!(!err.has_field("images[0]"));
    }

    proptest! {
        #[test]
        fn mapping_is_deterministic(price in 1u64..1_000_000, quantity in 1u32..500, title in "[A-Za-z][A-Za-z ]{0,79}") {
            let product = Product::new(NewProduct { title, price: Cents(price), quantity, ..mug() }).unwrap();
            let mapper = mapper();
            prop_assert_eq!(mapper.to_listing_payload(&product).unwrap(), mapper.to_listing_payload(&product).unwrap());
        }
    }
}
