//! Service wiring: catalog, credential store, marketplace adapters and the
//! publishing pipeline, shared by every handler.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crosslist_auth::{CredentialStore, PendingAuthorizations};
use crosslist_catalog::{CatalogStore, JsonFileCatalogStore};
use crosslist_marketplaces::{
    http_client, EbayMapper, EbayOAuthClient, EbayPublisher, EtsyMapper, EtsyOAuthClient, EtsyPublisher,
};
use crosslist_publishing::{
    AuthorizationFlow, MarketplaceAdapter, MarketplaceRegistry, PublishConfig, PublishOrchestrator, RegistryError,
};

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("building http client: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub struct AppServices {
    pub catalog: Arc<dyn CatalogStore>,
    pub credentials: Arc<CredentialStore>,
    pub orchestrator: PublishOrchestrator,
    pub authorization: AuthorizationFlow,
    /// Cancelled on shutdown; in-flight publishes stop and restore their
    /// listing status.
    pub shutdown: CancellationToken,
}

impl AppServices {
    /// `pending` must be the instance the registered OAuth clients use.
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        registry: MarketplaceRegistry,
        pending: Arc<PendingAuthorizations>,
        publish: PublishConfig,
    ) -> Self {
        let credentials = Arc::new(CredentialStore::default());
        let registry = Arc::new(registry);
        let authorization = AuthorizationFlow::new(
            Arc::clone(&registry),
            Arc::clone(&credentials),
            pending,
            publish.call_timeout,
        );
        let orchestrator = PublishOrchestrator::new(
            Arc::clone(&catalog),
            Arc::clone(&credentials),
            registry,
            publish,
        );
        Self {
            catalog,
            credentials,
            orchestrator,
            authorization,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Production wiring: JSON-file catalog plus the eBay and Etsy adapters.
pub fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let http = http_client(config.publish.call_timeout)?;
    let pending = Arc::new(PendingAuthorizations::default());

    let ebay = Arc::new(config.ebay_config());
    let etsy = Arc::new(config.etsy_config());
    tracing::info!(
        ebay_environment = %ebay.environment,
        etsy_shop_configured = etsy.shop_id.is_some(),
        catalog_file = %config.catalog_file.display(),
        "wiring marketplaces"
    );

    let registry = MarketplaceRegistry::new()
        .with(MarketplaceAdapter::new(
            Arc::new(EbayOAuthClient::new(Arc::clone(&ebay), Arc::clone(&pending), http.clone())),
            Arc::new(EbayMapper::new(Arc::clone(&ebay))),
            Arc::new(EbayPublisher::new(ebay, http.clone())),
        )?)
        .with(MarketplaceAdapter::new(
            Arc::new(EtsyOAuthClient::new(Arc::clone(&etsy), Arc::clone(&pending), http.clone())),
            Arc::new(EtsyMapper::new(Arc::clone(&etsy))),
            Arc::new(EtsyPublisher::new(etsy, http)),
        )?);

    let catalog = Arc::new(JsonFileCatalogStore::new(&config.catalog_file));
    Ok(AppServices::new(catalog, registry, pending, config.publish.clone()))
}
