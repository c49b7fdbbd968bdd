use std::collections::BTreeMap;
use std::sync::Arc;

use crosslist_auth::OAuthClient;
use crosslist_core::Marketplace;
use crosslist_listings::{Publisher, SchemaMapper};

use crate::error::RegistryError;

/// The three capabilities one marketplace integration provides.
#[derive(Clone)]
pub struct MarketplaceAdapter {
    pub oauth: Arc<dyn OAuthClient>,
    pub mapper: Arc<dyn SchemaMapper>,
    pub publisher: Arc<dyn Publisher>,
}

impl MarketplaceAdapter {
    pub fn new(
        oauth: Arc<dyn OAuthClient>,
        mapper: Arc<dyn SchemaMapper>,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self, RegistryError> {
        let marketplace = publisher.marketplace();
        for (part, other) in [("oauth client", oauth.marketplace()), ("mapper", mapper.marketplace())] {
            if other != marketplace {
                return Err(RegistryError::MismatchedParts {
                    publisher: marketplace,
                    other,
                    part,
                });
            }
        }
        Ok(Self { oauth, mapper, publisher })
    }

    pub fn marketplace(&self) -> Marketplace {
        self.publisher.marketplace()
    }
}

impl std::fmt::Debug for MarketplaceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceAdapter")
            .field("marketplace", &self.marketplace())
            .finish_non_exhaustive()
    }
}

/// Marketplace -> adapter lookup. Supporting a new marketplace means
/// registering one more adapter; the orchestrator never matches on the enum.
#[derive(Debug, Clone, Default)]
pub struct MarketplaceRegistry {
    adapters: BTreeMap<Marketplace, MarketplaceAdapter>,
}

impl MarketplaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `adapter`, replacing any earlier one for the same marketplace.
    pub fn register(&mut self, adapter: MarketplaceAdapter) -> &mut Self {
        self.adapters.insert(adapter.marketplace(), adapter);
        self
    }

    pub fn with(mut self, adapter: MarketplaceAdapter) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, marketplace: Marketplace) -> Option<&MarketplaceAdapter> {
        self.adapters.get(&marketplace)
    }

    pub fn marketplaces(&self) -> impl Iterator<Item = Marketplace> + '_ {
        self.adapters.keys().copied()
    }
}
