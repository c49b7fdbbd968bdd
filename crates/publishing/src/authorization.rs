use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crosslist_auth::{AuthError, CredentialState, CredentialStore, MarketplaceCredential, PendingAuthorizations};
use crosslist_core::Marketplace;

use crate::error::AuthorizationError;
use crate::registry::{MarketplaceAdapter, MarketplaceRegistry};

/// The seller-facing OAuth round trip: send the seller to the marketplace,
/// then turn the callback's code into a stored credential.
///
/// `pending` must be the same instance the registered OAuth clients read
/// their PKCE verifiers from.
pub struct AuthorizationFlow {
    registry: Arc<MarketplaceRegistry>,
    credentials: Arc<CredentialStore>,
    pending: Arc<PendingAuthorizations>,
    call_timeout: Duration,
}

impl AuthorizationFlow {
    pub fn new(
        registry: Arc<MarketplaceRegistry>,
        credentials: Arc<CredentialStore>,
        pending: Arc<PendingAuthorizations>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            credentials,
            pending,
            call_timeout,
        }
    }

    fn adapter(&self, marketplace: Marketplace) -> Result<&MarketplaceAdapter, AuthorizationError> {
        self.registry
            .get(marketplace)
            .ok_or(AuthorizationError::Unsupported(marketplace))
    }

    pub fn begin(&self, marketplace: Marketplace) -> Result<Url, AuthorizationError> {
        let adapter = self.adapter(marketplace)?;
        let state = self.pending.issue(marketplace);
        let url = adapter.oauth.authorization_url(&state)?;
        tracing::info!(marketplace = %marketplace, "authorization started");
        Ok(url)
    }

    pub async fn complete(
        &self,
        marketplace: Marketplace,
        code: &str,
        state: &str,
    ) -> Result<CredentialState, AuthorizationError> {
        let adapter = self.adapter(marketplace)?;
        let exchange = adapter.oauth.exchange_code(code, state);
        let credential = tokio::time::timeout(self.call_timeout, exchange)
            .await
            .map_err(|_| {
                AuthError::Transport(format!(
                    "code exchange timed out after {}s",
                    self.call_timeout.as_secs()
                ))
            })?
            .inspect_err(|err| tracing::warn!(marketplace = %marketplace, error = %err, "code exchange failed"))?;

        self.credentials.put(marketplace, credential)?;
        let connected = self.credentials.state(marketplace);
        tracing::info!(marketplace = %marketplace, state = ?connected, "marketplace connected");
        Ok(connected)
    }

    /// Refresh the stored access token now, regardless of its expiry.
    pub async fn refresh(&self, marketplace: Marketplace) -> Result<CredentialState, AuthorizationError> {
        let adapter = self.adapter(marketplace)?;
        let observed = self.credentials.snapshot(marketplace)?.generation;
        let oauth = Arc::clone(&adapter.oauth);
        let timeout = self.call_timeout;

        self.credentials
            .refresh_with(marketplace, observed, move |current: MarketplaceCredential| async move {
                tokio::time::timeout(timeout, oauth.refresh(&current))
                    .await
                    .unwrap_or_else(|_| {
                        Err(AuthError::Transport(format!(
                            "token refresh timed out after {}s",
                            timeout.as_secs()
                        )))
                    })
            })
            .await?;

        let refreshed = self.credentials.state(marketplace);
        tracing::info!(marketplace = %marketplace, state = ?refreshed, "access token refreshed on request");
        Ok(refreshed)
    }

    pub fn status(&self, marketplace: Marketplace) -> CredentialState {
        self.credentials.state(marketplace)
    }
}
