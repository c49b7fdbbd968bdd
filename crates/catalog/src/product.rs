use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crosslist_core::{Cents, DomainError, DomainResult, Marketplace, ProductId};

/// Publication state of a product on one marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ListingStatus {
    #[default]
    Unpublished,
    /// A publish call is in flight.
    Pending,
    Published {
        external_id: String,
    },
    /// A terminal failure. `external_id` is the marketplace listing the
    /// product last published to, if any, so a retry updates it in place.
    Failed {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        external_id: Option<String>,
    },
}

impl ListingStatus {
    pub fn published(external_id: impl Into<String>) -> Self {
        Self::Published {
            external_id: external_id.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            external_id: None,
        }
    }

    /// Last known marketplace listing id: the published one, or the one a
    /// failed republish left behind.
    pub fn external_id(&self) -> Option<&str> {
        match self {
            ListingStatus::Published { external_id } => Some(external_id),
            ListingStatus::Failed { external_id, .. } => external_id.as_deref(),
            _ => None,
        }
    }

    /// Carry `prior`'s listing id into a failure that does not name one.
    pub fn keeping_listing_of(self, prior: &ListingStatus) -> Self {
        match self {
            ListingStatus::Failed {
                reason,
                external_id: None,
            } => ListingStatus::Failed {
                reason,
                external_id: prior.external_id().map(str::to_string),
            },
            other => other,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ListingStatus::Pending)
    }

    /// Short label used in exports and API responses.
    pub fn label(&self) -> &'static str {
        match self {
            ListingStatus::Unpublished => "unpublished",
            ListingStatus::Pending => "pending",
            ListingStatus::Published { .. } => "published",
            ListingStatus::Failed { .. } => "failed",
        }
    }
}

/// Profit margin as a ratio of price.
///
/// A zero price has no meaningful margin; it is reported as `Undefined`
/// rather than a NaN or infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfitMargin {
    Defined(f64),
    Undefined,
}

impl ProfitMargin {
    pub fn compute(price: Cents, cost: Cents) -> Self {
        if price.is_zero() {
            return ProfitMargin::Undefined;
        }
        let price = price.get() as f64;
        let cost = cost.get() as f64;
        ProfitMargin::Defined((price - cost) / price)
    }

    pub fn as_ratio(self) -> Option<f64> {
        match self {
            ProfitMargin::Defined(ratio) => Some(ratio),
            ProfitMargin::Undefined => None,
        }
    }
}

impl fmt::Display for ProfitMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitMargin::Defined(ratio) => write!(f, "{:.2}%", ratio * 100.0),
            ProfitMargin::Undefined => f.write_str("undefined"),
        }
    }
}

/// Input for creating a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: Cents,
    pub cost: Cents,
    pub quantity: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// A product in the seller's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    title: String,
    description: String,
    price: Cents,
    cost: Cents,
    quantity: u32,
    images: Vec<String>,
    category: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    listings: BTreeMap<Marketplace, ListingStatus>,
}

impl Product {
    /// Create a product with a fresh identifier.
    pub fn new(input: NewProduct) -> DomainResult<Self> {
        Self::create(ProductId::new(), input, Utc::now())
    }

    /// Create a product with an explicit identifier and creation time.
    pub fn create(id: ProductId, input: NewProduct, created_at: DateTime<Utc>) -> DomainResult<Self> {
        if input.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        if input.description.trim().is_empty() {
            return Err(DomainError::validation("description cannot be empty"));
        }

        let category = input
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(Self {
            id,
            title: input.title.trim().to_string(),
            description: input.description,
            price: input.price,
            cost: input.cost,
            quantity: input.quantity,
            images: input.images,
            category,
            created_at,
            listings: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Cents {
        self.price
    }

    pub fn cost(&self) -> Cents {
        self.cost
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn margin(&self) -> ProfitMargin {
        ProfitMargin::compute(self.price, self.cost)
    }

    /// Status on `marketplace`; marketplaces never published to are `Unpublished`.
    pub fn listing_status(&self, marketplace: Marketplace) -> ListingStatus {
        self.listings.get(&marketplace).cloned().unwrap_or_default()
    }

    pub fn listings(&self) -> &BTreeMap<Marketplace, ListingStatus> {
        &self.listings
    }

    pub fn set_listing_status(&mut self, marketplace: Marketplace, status: ListingStatus) {
        if status == ListingStatus::Unpublished {
            self.listings.remove(&marketplace);
        } else {
            self.listings.insert(marketplace, status);
        }
    }
}
