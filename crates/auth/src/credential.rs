use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crosslist_core::Marketplace;

use crate::secret::Secret;

/// OAuth application credentials issued by a marketplace developer portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Secret,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<Secret>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

/// Tokens returned by a marketplace token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: Secret,
    pub refresh_token: Option<Secret>,
    pub expires_in: Duration,
    pub refresh_token_expires_in: Option<Duration>,
}

impl TokenGrant {
    /// Convert a token endpoint's `expires_in` seconds, clamped to a sane range.
    pub fn seconds(secs: u64) -> Duration {
        const TEN_YEARS: u64 = 10 * 365 * 24 * 60 * 60;
        Duration::seconds(secs.min(TEN_YEARS) as i64)
    }
}

/// Lifecycle of a marketplace credential at a given instant.
///
/// `Unauthenticated → Authorized → (Expiring → Authorized)* → Revoked`.
/// A credential only becomes `Revoked` when the marketplace rejects its
/// refresh token; recovering needs a new authorization-code flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    Unauthenticated,
    Authorized,
    /// Access token expired (or about to), refresh token still usable.
    Expiring,
    Revoked,
}

/// OAuth token set for one marketplace plus the app credentials used to
/// refresh it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceCredential {
    marketplace: Marketplace,
    client: ClientCredentials,
    access_token: Option<Secret>,
    refresh_token: Option<Secret>,
    expires_at: Option<DateTime<Utc>>,
    refresh_expires_at: Option<DateTime<Utc>>,
    revoked: bool,
}

impl MarketplaceCredential {
    /// App credentials with no user tokens yet.
    pub fn unauthenticated(marketplace: Marketplace, client: ClientCredentials) -> Self {
        Self {
            marketplace,
            client,
            access_token: None,
            refresh_token: None,
            expires_at: None,
            refresh_expires_at: None,
            revoked: false,
        }
    }

    /// Credential produced by an authorization-code exchange at `now`.
    pub fn from_grant(
        marketplace: Marketplace,
        client: ClientCredentials,
        grant: TokenGrant,
        now: DateTime<Utc>,
    ) -> Self {
        Self::unauthenticated(marketplace, client).refreshed(grant, now)
    }

    /// Apply a refresh grant received at `now`.
    ///
    /// Marketplaces that do not rotate refresh tokens omit them from the
    /// response; the current refresh token (and its expiry) is kept then.
    pub fn refreshed(&self, grant: TokenGrant, now: DateTime<Utc>) -> Self {
        let (refresh_token, refresh_expires_at) = match grant.refresh_token {
            Some(token) => (
                Some(token),
                grant.refresh_token_expires_in.map(|ttl| now + ttl),
            ),
            None => (self.refresh_token.clone(), self.refresh_expires_at),
        };

        Self {
            marketplace: self.marketplace,
            client: self.client.clone(),
            access_token: Some(grant.access_token),
            refresh_token,
            expires_at: Some(now + grant.expires_in),
            refresh_expires_at,
            revoked: false,
        }
    }

    /// Drop all user tokens; the app credentials stay.
    pub fn revoked(&self) -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            expires_at: None,
            refresh_expires_at: None,
            revoked: true,
            ..self.clone()
        }
    }

    pub fn marketplace(&self) -> Marketplace {
        self.marketplace
    }

    pub fn client(&self) -> &ClientCredentials {
        &self.client
    }

    pub fn access_token(&self) -> Option<&Secret> {
        self.access_token.as_ref()
    }

    pub fn refresh_token(&self) -> Option<&Secret> {
        self.refresh_token.as_ref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    /// Valid iff an access token is present and `now < expires_at - safety_margin`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, safety_margin: Duration) -> bool {
        if self.revoked || self.access_token.is_none() {
            return false;
        }
        self.expires_at
            .is_some_and(|expires_at| now < expires_at - safety_margin)
    }

    /// Whether a refresh grant can be attempted at `now`.
    pub fn can_refresh(&self, now: DateTime<Utc>) -> bool {
        !self.revoked
            && self.refresh_token.is_some()
            && self.refresh_expires_at.is_none_or(|expires_at| now < expires_at)
    }

    pub fn state_at(&self, now: DateTime<Utc>, safety_margin: Duration) -> CredentialState {
        if self.revoked {
            CredentialState::Revoked
        } else if self.is_valid_at(now, safety_margin) {
            CredentialState::Authorized
        } else if self.can_refresh(now) {
            CredentialState::Expiring
        } else {
            CredentialState::Unauthenticated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientCredentials {
        ClientCredentials::new("app-id", "app-secret")
    }

    fn grant(expires_in_secs: u64, refresh: Option<&str>) -> TokenGrant {
        TokenGrant {
            access_token: Secret::new("access-1"),
            refresh_token: refresh.map(Secret::new),
            expires_in: TokenGrant::seconds(expires_in_secs),
            refresh_token_expires_in: None,
        }
    }

    #[test]
    fn valid_until_safety_margin_before_expiry() {
        let now = Utc::now();
        let margin = Duration::seconds(60);
        let credential =
            MarketplaceCredential::from_grant(Marketplace::Ebay, client(), grant(7200, Some("r")), now);

        assert!(credential.is_valid_at(now, margin));
        assert!(credential.is_valid_at(now + Duration::seconds(7139), margin));
        assert!(!credential.is_valid_at(now + Duration::seconds(7140), margin));
        assert!(!credential.is_valid_at(now + Duration::seconds(9000), margin));
    }

    #[test]
    fn unauthenticated_credential_is_never_valid() {
        let credential = MarketplaceCredential::unauthenticated(Marketplace::Etsy, client());
        assert!(!credential.is_valid_at(Utc::now(), Duration::zero()));
        assert_eq!(
            credential.state_at(Utc::now(), Duration::zero()),
            CredentialState::Unauthenticated
        );
    }

    #[test]
    fn refresh_keeps_previous_refresh_token_when_none_returned() {
        let now = Utc::now();
        let first = MarketplaceCredential::from_grant(Marketplace::Ebay, client(), grant(10, Some("r-1")), now);
        let second = first.refreshed(
            TokenGrant {
                access_token: Secret::new("access-2"),
                refresh_token: None,
                expires_in: TokenGrant::seconds(7200),
                refresh_token_expires_in: None,
            },
            now,
        );

        assert_eq!(second.access_token().map(Secret::expose), Some("access-2"));
        assert_eq!(second.refresh_token().map(Secret::expose), Some("r-1"));
    }

    #[test]
    fn state_walks_through_the_lifecycle() {
        let now = Utc::now();
        let margin = Duration::seconds(60);
        let credential =
            MarketplaceCredential::from_grant(Marketplace::Etsy, client(), grant(3600, Some("r")), now);

        assert_eq!(credential.state_at(now, margin), CredentialState::Authorized);
        assert_eq!(
            credential.state_at(now + Duration::hours(2), margin),
            CredentialState::Expiring
        );
        assert_eq!(credential.revoked().state_at(now, margin), CredentialState::Revoked);
    }

    #[test]
    fn expired_refresh_token_cannot_refresh() {
        let now = Utc::now();
        let mut g = grant(60, Some("r"));
        g.refresh_token_expires_in = Some(Duration::days(1));
        let credential = MarketplaceCredential::from_grant(Marketplace::Ebay, client(), g, now);

        assert!(credential.can_refresh(now + Duration::hours(23)));
        assert!(!credential.can_refresh(now + Duration::days(2)));
        assert_eq!(
            credential.state_at(now + Duration::days(2), Duration::zero()),
            CredentialState::Unauthenticated
        );
    }

    #[test]
    fn revoking_clears_tokens_but_keeps_app_credentials() {
        let credential = MarketplaceCredential::from_grant(
            Marketplace::Ebay,
            client(),
            grant(3600, Some("r")),
            Utc::now(),
        )
        .revoked();

        assert!(credential.is_revoked());
        assert!(credential.access_token().is_none());
        assert!(credential.refresh_token().is_none());
        assert_eq!(credential.client().client_id, "app-id");
    }

    #[test]
    fn debug_never_prints_tokens() {
        let credential =
            MarketplaceCredential::from_grant(Marketplace::Ebay, client(), grant(3600, Some("r-secret")), Utc::now());
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("access-1"));
        assert!(!rendered.contains("r-secret"));
        assert!(!rendered.contains("app-secret"));
    }
}
