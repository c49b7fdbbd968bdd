use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use url::Url;

use crosslist_auth::{AuthError, MarketplaceCredential, OAuthClient, PendingAuthorizations};
use crosslist_core::Marketplace;

use super::config::EbayConfig;
use crate::token::{request_grant, TokenFailure};

/// eBay OAuth2 authorization-code grant (no PKCE; the RuName stands in for
/// the redirect uri).
pub struct EbayOAuthClient {
    config: Arc<EbayConfig>,
    pending: Arc<PendingAuthorizations>,
    http: Client,
}

impl EbayOAuthClient {
    pub fn new(config: Arc<EbayConfig>, pending: Arc<PendingAuthorizations>, http: Client) -> Self {
        Self { config, pending, http }
    }
}

#[async_trait]
impl OAuthClient for EbayOAuthClient {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Ebay
    }

    fn authorization_url(&self, state: &str) -> Result<Url, AuthError> {
        self.pending.challenge(Marketplace::Ebay, state)?;

        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| AuthError::Misconfigured(format!("eBay authorize url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scope())
            .append_pair("state", state);
        Ok(url)
    }

    async fn exchange_code(&self, code: &str, state: &str) -> Result<MarketplaceCredential, AuthError> {
        self.pending.consume(Marketplace::Ebay, state)?;

        let grant = request_grant(
            &self.http,
            &self.config.token_url,
            &self.config.client,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ],
        )
        .await
        .map_err(TokenFailure::for_exchange)?;

        tracing::info!(marketplace = %Marketplace::Ebay, "authorization code exchanged");
        Ok(MarketplaceCredential::from_grant(
            Marketplace::Ebay,
            self.config.client.clone(),
            grant,
            Utc::now(),
        ))
    }

    async fn refresh(&self, credential: &MarketplaceCredential) -> Result<MarketplaceCredential, AuthError> {
        let refresh_token = credential.refresh_token().ok_or(AuthError::Unauthenticated)?;
        let scope = self.config.scope();

        let grant = request_grant(
            &self.http,
            &self.config.token_url,
            credential.client(),
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose()),
                ("scope", scope.as_str()),
            ],
        )
        .await
        .map_err(TokenFailure::for_refresh)?;

        Ok(credential.refreshed(grant, Utc::now()))
    }
}
