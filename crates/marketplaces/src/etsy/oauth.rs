use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use url::Url;

use crosslist_auth::{AuthError, MarketplaceCredential, OAuthClient, PendingAuthorizations};
use crosslist_core::Marketplace;

use super::config::EtsyConfig;
use crate::token::{request_grant, TokenFailure};

/// Etsy OAuth2 authorization-code grant with PKCE (S256).
pub struct EtsyOAuthClient {
    config: Arc<EtsyConfig>,
    pending: Arc<PendingAuthorizations>,
    http: Client,
}

impl EtsyOAuthClient {
    pub fn new(config: Arc<EtsyConfig>, pending: Arc<PendingAuthorizations>, http: Client) -> Self {
        Self { config, pending, http }
    }
}

#[async_trait]
impl OAuthClient for EtsyOAuthClient {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Etsy
    }

    fn authorization_url(&self, state: &str) -> Result<Url, AuthError> {
        let challenge = self.pending.challenge(Marketplace::Etsy, state)?;

        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| AuthError::Misconfigured(format!("Etsy authorize url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scope())
            .append_pair("state", state)
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256");
        Ok(url)
    }

    async fn exchange_code(&self, code: &str, state: &str) -> Result<MarketplaceCredential, AuthError> {
        let pkce = self.pending.consume(Marketplace::Etsy, state)?;

        let grant = request_grant(
            &self.http,
            &self.config.token_url,
            &self.config.client,
            &[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code", code),
                ("code_verifier", pkce.verifier.expose()),
            ],
        )
        .await
        .map_err(TokenFailure::for_exchange)?;

        tracing::info!(marketplace = %Marketplace::Etsy, "authorization code exchanged");
        Ok(MarketplaceCredential::from_grant(
            Marketplace::Etsy,
            self.config.client.clone(),
            grant,
            Utc::now(),
        ))
    }

    async fn refresh(&self, credential: &MarketplaceCredential) -> Result<MarketplaceCredential, AuthError> {
        let refresh_token = credential.refresh_token().ok_or(AuthError::Unauthenticated)?;

        let grant = request_grant(
            &self.http,
            &self.config.token_url,
            credential.client(),
            &[
                ("grant_type", "refresh_token"),
                ("client_id", credential.client().client_id.as_str()),
                ("refresh_token", refresh_token.expose()),
            ],
        )
        .await
        .map_err(TokenFailure::for_refresh)?;

        Ok(credential.refreshed(grant, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crosslist_auth::{ClientCredentials, PkcePair};

    #[test]
    fn authorization_url_carries_the_pkce_challenge() {
        let pending = Arc::new(PendingAuthorizations::default());
        let config = EtsyConfig::new(
            ClientCredentials::new("keystring", "shared-secret"),
            "https://app.example.com/callback/etsy",
        );
        let client = EtsyOAuthClient::new(Arc::new(config), Arc::clone(&pending), Client::new());

        let state = pending.issue(Marketplace::Etsy);
        let url = client.authorization_url(&state).unwrap();
        assert!(url.as_str().starts_with("https://www.etsy.com/oauth/connect?"));

        let query: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(query["scope"], "listings_r listings_w");
        assert_eq!(query["redirect_uri"], "https://app.example.com/callback/etsy");
        assert_eq!(query["code_challenge_method"], "S256");

        let pkce = pending.consume(Marketplace::Etsy, &state).unwrap();
        assert_eq!(query["code_challenge"], pkce.challenge);
        assert_eq!(PkcePair::from_verifier(pkce.verifier.expose()).challenge, pkce.challenge);
    }
}
