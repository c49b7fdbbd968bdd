use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_LANGUAGE;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;

use crosslist_auth::MarketplaceCredential;
use crosslist_core::Marketplace;
use crosslist_listings::{MarketplacePayload, PublishResult, Publisher};

use super::config::EbayConfig;
use super::mapper::EbayListing;
use super::{error_details, OFFER_EXISTS, RESPONSES};
use crate::http::{check, malformed, send};

/// Publishes through the Sell Inventory API: inventory item, then offer,
/// then offer publication.
pub struct EbayPublisher {
    config: Arc<EbayConfig>,
    http: Client,
}

impl EbayPublisher {
    pub fn new(config: Arc<EbayConfig>, http: Client) -> Self {
        Self { config, http }
    }

    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        let url = format!(
            "{}/sell/inventory/v1/{path}",
            self.config.api_base.trim_end_matches('/')
        );
        self.http
            .request(method, url)
            .bearer_auth(token)
            .header(CONTENT_LANGUAGE, &self.config.content_language)
    }

    async fn publish_listing(
        &self,
        payload: &MarketplacePayload,
        credential: &MarketplaceCredential,
    ) -> Result<String, PublishResult> {
        let listing: EbayListing = payload
            .decode()
            .map_err(|e| PublishResult::error("invalid_payload", e.to_string(), false))?;
        let token = credential.access_token().ok_or(PublishResult::AuthRejected)?.expose();

        let reply = send(
            self.request(Method::PUT, &format!("inventory_item/{}", listing.sku), token)
                .json(&listing.inventory_item),
        )
        .await?;
        check(&reply, &RESPONSES, error_details)?;
        tracing::debug!(sku = %listing.sku, "eBay inventory item stored");

        let offer_id = self.upsert_offer(&listing, token).await?;

        let reply = send(self.request(Method::POST, &format!("offer/{offer_id}/publish"), token)).await?;
        check(&reply, &RESPONSES, error_details)?;
        reply.str_field("listingId").ok_or_else(|| malformed("listingId"))
    }

    /// Create the offer, or update the one eBay already holds for this SKU.
    async fn upsert_offer(&self, listing: &EbayListing, token: &str) -> Result<String, PublishResult> {
        let reply = send(self.request(Method::POST, "offer", token).json(&listing.offer)).await?;

        // Keyed on the error code alone, whatever the status.
        if let Some(offer_id) = existing_offer_id(&reply.body) {
            tracing::debug!(sku = %listing.sku, offer_id = %offer_id, "eBay offer exists, updating it");
            let reply = send(
                self.request(Method::PUT, &format!("offer/{offer_id}"), token)
                    .json(&listing.offer),
            )
            .await?;
            check(&reply, &RESPONSES, error_details)?;
            return Ok(offer_id);
        }

        check(&reply, &RESPONSES, error_details)?;
        reply.str_field("offerId").ok_or_else(|| malformed("offerId"))
    }
}

/// Offer id named by an "offer entity already exists" error.
fn existing_offer_id(body: &Value) -> Option<String> {
    body.get("errors")?
        .as_array()?
        .iter()
        .filter(|e| e.get("errorId").is_some_and(|id| id.to_string().trim_matches('"') == OFFER_EXISTS))
        .filter_map(|e| e.get("parameters")?.as_array())
        .flatten()
        .find(|p| p.get("name").and_then(Value::as_str) == Some("offerId"))
        .and_then(|p| p.get("value")?.as_str())
        .map(str::to_string)
}

#[async_trait]
impl Publisher for EbayPublisher {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Ebay
    }

    async fn publish(&self, payload: &MarketplacePayload, credential: &MarketplaceCredential) -> PublishResult {
        match self.publish_listing(payload, credential).await {
            Ok(listing_id) => PublishResult::Success(listing_id),
            Err(result) => result,
        }
    }
}
