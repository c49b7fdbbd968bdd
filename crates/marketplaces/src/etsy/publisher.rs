use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};

use crosslist_auth::MarketplaceCredential;
use crosslist_core::Marketplace;
use crosslist_listings::{MarketplacePayload, PublishResult, Publisher};

use super::config::EtsyConfig;
use super::mapper::EtsyListing;
use super::{error_details, RESPONSES};
use crate::http::{check, malformed, send};
use crate::images;

/// Creates (or updates) the shop listing, then uploads locally stored
/// images. Image upload failures are logged and never fail the listing.
pub struct EtsyPublisher {
    config: Arc<EtsyConfig>,
    http: Client,
}

impl EtsyPublisher {
    pub fn new(config: Arc<EtsyConfig>, http: Client) -> Self {
        Self { config, http }
    }

    fn authorized(&self, request: RequestBuilder, credential: &MarketplaceCredential, token: &str) -> RequestBuilder {
        request
            .bearer_auth(token)
            .header("x-api-key", &credential.client().client_id)
    }

    async fn publish_listing(
        &self,
        payload: &MarketplacePayload,
        credential: &MarketplaceCredential,
    ) -> Result<String, PublishResult> {
        let listing: EtsyListing = payload
            .decode()
            .map_err(|e| PublishResult::error("invalid_payload", e.to_string(), false))?;
        let shop_id = self
            .config
            .shop_id
            .as_deref()
            .ok_or_else(|| PublishResult::error("shop_not_configured", "no Etsy shop id configured", false))?;
        let token = credential.access_token().ok_or(PublishResult::AuthRejected)?.expose();

        let listings_url = format!("{}/shops/{shop_id}/listings", self.config.api_base.trim_end_matches('/'));
        let request = match &listing.listing_id {
            Some(id) => self.http.patch(format!("{listings_url}/{id}")),
            None => self.http.post(&listings_url),
        };
        let reply = send(self.authorized(request, credential, token).json(&listing.draft)).await?;
        check(&reply, &RESPONSES, error_details)?;

        let listing_id = reply
            .str_field("listing_id")
            .or_else(|| listing.listing_id.clone())
            .ok_or_else(|| malformed("listing_id"))?;

        // Images already belong to a listing that is being updated.
        if listing.listing_id.is_none() {
            let images_url = format!("{listings_url}/{listing_id}/images");
            self.upload_images(&images_url, &listing.images, credential, token).await;
        }
        Ok(listing_id)
    }

    async fn upload_images(&self, url: &str, references: &[String], credential: &MarketplaceCredential, token: &str) {
        for reference in references {
            let Some(path) = images::local_path(reference, &self.config.media_root) else {
                tracing::debug!(image = %reference, "skipping remote image for Etsy upload");
                continue;
            };
            match self.upload_image(url, &path, credential, token).await {
                Ok(()) => tracing::debug!(image = %reference, "Etsy image uploaded"),
                Err(reason) => tracing::warn!(image = %reference, error = %reason, "Etsy image upload failed"),
            }
        }
    }

    async fn upload_image(
        &self,
        url: &str,
        path: &Path,
        credential: &MarketplaceCredential,
        token: &str,
    ) -> Result<(), String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("reading {}: {e}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let form = Form::new().part("image", Part::bytes(bytes).file_name(file_name));

        let reply = send(self.authorized(self.http.post(url), credential, token).multipart(form))
            .await
            .map_err(describe)?;
        check(&reply, &RESPONSES, error_details).map_err(describe)
    }
}

fn describe(result: PublishResult) -> String {
    match result {
        PublishResult::MarketplaceError { code, message, .. } => format!("{code}: {message}"),
        other => format!("{other:?}"),
    }
}

#[async_trait]
impl Publisher for EtsyPublisher {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Etsy
    }

    async fn publish(&self, payload: &MarketplacePayload, credential: &MarketplaceCredential) -> PublishResult {
        match self.publish_listing(payload, credential).await {
            Ok(listing_id) => PublishResult::Success(listing_id),
            Err(result) => result,
        }
    }
}
