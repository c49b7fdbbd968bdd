#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use crosslist_auth::{
    AuthError, ClientCredentials, CredentialStore, MarketplaceCredential, OAuthClient, PendingAuthorizations, Secret,
    TokenGrant,
};
use crosslist_catalog::{InMemoryCatalogStore, NewProduct, Product};
use crosslist_core::{Cents, Marketplace, ProductId};
use crosslist_listings::{MarketplacePayload, PublishResult, Publisher, SchemaMapper, ValidationError};
use crosslist_publishing::{
    MarketplaceAdapter, MarketplaceRegistry, PublishConfig, PublishOrchestrator, RetryPolicy,
};

pub fn grant(access_token: &str) -> TokenGrant {
    TokenGrant {
        access_token: Secret::new(access_token),
        refresh_token: Some(Secret::new("refresh-token")),
        expires_in: TokenGrant::seconds(3600),
        refresh_token_expires_in: None,
    }
}

pub fn valid_credential(marketplace: Marketplace) -> MarketplaceCredential {
    MarketplaceCredential::from_grant(marketplace, ClientCredentials::new("app", "secret"), grant("access-0"), Utc::now())
}

/// Issued two hours ago with a one hour lifetime.
pub fn expired_credential(marketplace: Marketplace) -> MarketplaceCredential {
    MarketplaceCredential::from_grant(
        marketplace,
        ClientCredentials::new("app", "secret"),
        grant("access-0"),
        Utc::now() - chrono::Duration::hours(2),
    )
}

pub struct FakeOAuth {
    marketplace: Marketplace,
    pending: Arc<PendingAuthorizations>,
    refreshes: AtomicUsize,
    refresh_delay: Duration,
    refresh_failures: Mutex<VecDeque<AuthError>>,
}

impl FakeOAuth {
    pub fn new(marketplace: Marketplace) -> Arc<Self> {
        Self::with_pending(marketplace, Arc::new(PendingAuthorizations::default()))
    }

    pub fn with_pending(marketplace: Marketplace, pending: Arc<PendingAuthorizations>) -> Arc<Self> {
        Self::build(marketplace, pending, Duration::ZERO, [])
    }

    pub fn slow(marketplace: Marketplace, refresh_delay: Duration) -> Arc<Self> {
        Self::build(marketplace, Arc::new(PendingAuthorizations::default()), refresh_delay, [])
    }

    /// Refresh fails with `failures` in order before succeeding.
    pub fn failing(marketplace: Marketplace, failures: impl IntoIterator<Item = AuthError>) -> Arc<Self> {
        Self::build(marketplace, Arc::new(PendingAuthorizations::default()), Duration::ZERO, failures)
    }

    fn build(
        marketplace: Marketplace,
        pending: Arc<PendingAuthorizations>,
        refresh_delay: Duration,
        failures: impl IntoIterator<Item = AuthError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            marketplace,
            pending,
            refreshes: AtomicUsize::new(0),
            refresh_delay,
            refresh_failures: Mutex::new(failures.into_iter().collect()),
        })
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthClient for FakeOAuth {
    fn marketplace(&self) -> Marketplace {
        self.marketplace
    }

    fn authorization_url(&self, state: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&format!("https://auth.example.com/{}", self.marketplace))
            .map_err(|e| AuthError::Misconfigured(e.to_string()))?;
        url.query_pairs_mut().append_pair("state", state);
        Ok(url)
    }

    async fn exchange_code(&self, code: &str, state: &str) -> Result<MarketplaceCredential, AuthError> {
        self.pending.consume(self.marketplace, state)?;
        if code == "bad-code" {
            return Err(AuthError::ExchangeRejected("invalid_grant".to_string()));
        }
        Ok(MarketplaceCredential::from_grant(
            self.marketplace,
            ClientCredentials::new("app", "secret"),
            grant(&format!("access-{code}")),
            Utc::now(),
        ))
    }

    async fn refresh(&self, credential: &MarketplaceCredential) -> Result<MarketplaceCredential, AuthError> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        if let Some(err) = self.refresh_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(credential.refreshed(grant(&format!("refreshed-{n}")), Utc::now()))
    }
}

pub struct FakeMapper {
    marketplace: Marketplace,
    reject: bool,
}

impl FakeMapper {
    pub fn new(marketplace: Marketplace) -> Arc<Self> {
        Arc::new(Self {
            marketplace,
            reject: false,
        })
    }

    pub fn rejecting(marketplace: Marketplace) -> Arc<Self> {
        Arc::new(Self {
            marketplace,
            reject: true,
        })
    }
}

impl SchemaMapper for FakeMapper {
    fn marketplace(&self) -> Marketplace {
        self.marketplace
    }

    fn to_listing_payload(&self, product: &Product) -> Result<MarketplacePayload, ValidationError> {
        if self.reject {
            return Err(ValidationError::single(self.marketplace, "title", "must be at most 80 characters"));
        }
        MarketplacePayload::encode(self.marketplace, product.id().to_string(), &product.title())
            .map_err(|e| ValidationError::single(self.marketplace, "payload", e.to_string()))
    }
}

/// Replays `script`, then answers `fallback` forever.
pub struct FakePublisher {
    marketplace: Marketplace,
    script: Mutex<VecDeque<PublishResult>>,
    fallback: PublishResult,
    delay: Duration,
    tokens: Mutex<Vec<String>>,
}

impl FakePublisher {
    pub fn succeeding(marketplace: Marketplace) -> Arc<Self> {
        Self::scripted(marketplace, [], PublishResult::Success(format!("{marketplace}-1")))
    }

    pub fn always(marketplace: Marketplace, result: PublishResult) -> Arc<Self> {
        Self::scripted(marketplace, [], result)
    }

    pub fn scripted(
        marketplace: Marketplace,
        script: impl IntoIterator<Item = PublishResult>,
        fallback: PublishResult,
    ) -> Arc<Self> {
        Self::delayed(marketplace, script, fallback, Duration::ZERO)
    }

    pub fn delayed(
        marketplace: Marketplace,
        script: impl IntoIterator<Item = PublishResult>,
        fallback: PublishResult,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            marketplace,
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            delay,
            tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    /// Access tokens presented, one per call.
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    fn marketplace(&self) -> Marketplace {
        self.marketplace
    }

    async fn publish(&self, _payload: &MarketplacePayload, credential: &MarketplaceCredential) -> PublishResult {
        let token = credential.access_token().map(|t| t.expose().to_string()).unwrap_or_default();
        self.tokens.lock().unwrap().push(token);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn adapter(oauth: Arc<FakeOAuth>, mapper: Arc<FakeMapper>, publisher: Arc<FakePublisher>) -> MarketplaceAdapter {
    MarketplaceAdapter::new(oauth, mapper, publisher).unwrap()
}

pub fn test_config() -> PublishConfig {
    PublishConfig {
        retry: RetryPolicy {
            jitter: 0.0,
            ..RetryPolicy::exponential(3, Duration::from_secs(1), Duration::from_secs(10))
        },
        call_timeout: Duration::from_secs(30),
    }
}

pub fn new_product(title: &str) -> Product {
    Product::new(NewProduct {
        title: title.to_string(),
        description: "Hand thrown stoneware".to_string(),
        price: Cents(2400),
        cost: Cents(900),
        quantity: 3,
        images: vec!["https://cdn.example.com/mug.jpg".to_string()],
        category: Some("Mugs".to_string()),
    })
    .unwrap()
}

pub struct Harness {
    pub catalog: Arc<InMemoryCatalogStore>,
    pub credentials: Arc<CredentialStore>,
    pub orchestrator: PublishOrchestrator,
    pub product_id: ProductId,
}

impl Harness {
    pub fn new(registry: MarketplaceRegistry) -> Self {
        Self::with_config(registry, test_config())
    }

    pub fn with_config(registry: MarketplaceRegistry, config: PublishConfig) -> Self {
        let product = new_product("Speckled mug");
        let product_id = product.id();
        let catalog = Arc::new(InMemoryCatalogStore::with_products([product]));
        let credentials = Arc::new(CredentialStore::default());
        let orchestrator = PublishOrchestrator::new(
            catalog.clone(),
            Arc::clone(&credentials),
            Arc::new(registry),
            config,
        );
        Self {
            catalog,
            credentials,
            orchestrator,
            product_id,
        }
    }

    pub fn authorize(&self, credential: MarketplaceCredential) {
        self.credentials.put(credential.marketplace(), credential).unwrap();
    }

    pub fn product(&self) -> Product {
        use crosslist_catalog::CatalogStore;
        self.catalog.get(self.product_id).unwrap()
    }
}
