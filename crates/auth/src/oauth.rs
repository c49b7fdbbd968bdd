//! The OAuth capability every marketplace integration provides.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crosslist_core::Marketplace;

use crate::credential::MarketplaceCredential;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No usable credential; the user must go through the authorization flow.
    #[error("not authenticated with the marketplace")]
    Unauthenticated,

    /// The callback `state` does not match a pending authorization.
    #[error("authorization state is unknown, expired or already used")]
    InvalidState,

    /// The marketplace refused to exchange the authorization code.
    #[error("authorization code exchange rejected: {0}")]
    ExchangeRejected(String),

    /// The refresh token is invalid or expired; the credential is revoked.
    #[error("refresh token expired or revoked")]
    RefreshExpired,

    /// The marketplace rejected a freshly refreshed access token.
    #[error("access token rejected by the marketplace after refresh")]
    TokenRejected,

    /// Network failure, timeout or marketplace outage on an auth endpoint.
    #[error("auth endpoint unavailable: {0}")]
    Transport(String),

    /// Client configuration the marketplace refuses (bad client id, redirect uri, ...).
    #[error("oauth client misconfigured: {0}")]
    Misconfigured(String),
}

impl AuthError {
    /// Transient failures may be retried; everything else needs user or
    /// operator action.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::Transport(_))
    }
}

/// Marketplace-specific OAuth2 authorization-code flow.
#[async_trait]
pub trait OAuthClient: Send + Sync {
    fn marketplace(&self) -> Marketplace;

    /// Authorization endpoint URL carrying client id, redirect uri, scopes and
    /// the anti-forgery `state` (which must have been issued for this
    /// marketplace).
    fn authorization_url(&self, state: &str) -> Result<Url, AuthError>;

    /// Validate `state` against the pending authorization and exchange `code`
    /// for an access/refresh token pair.
    async fn exchange_code(&self, code: &str, state: &str) -> Result<MarketplaceCredential, AuthError>;

    /// Obtain a new access token from the credential's refresh token.
    async fn refresh(&self, credential: &MarketplaceCredential) -> Result<MarketplaceCredential, AuthError>;
}
