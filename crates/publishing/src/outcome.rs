use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crosslist_auth::AuthError;
use crosslist_catalog::ListingStatus;
use crosslist_core::{CorrelationId, Marketplace, ProductId};
use crosslist_listings::{PublishResult, ValidationError};

/// Final result of publishing one product to one marketplace.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Published { external_id: String },
    Invalid(ValidationError),
    Auth(AuthError),
    RateLimited { retry_after: Duration },
    MarketplaceError { code: String, message: String, retryable: bool },
    Cancelled,
    /// No adapter registered; the catalog was not touched.
    Unsupported,
    /// The marketplace call finished but the catalog could not record it.
    Storage(String),
}

impl PublishOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Published { .. } => "published",
            Self::Invalid(_) => "invalid",
            Self::Auth(_) => "auth_error",
            Self::RateLimited { .. } => "rate_limited",
            Self::MarketplaceError { .. } => "marketplace_error",
            Self::Cancelled => "cancelled",
            Self::Unsupported => "unsupported",
            Self::Storage(_) => "storage_error",
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }

    pub fn external_id(&self) -> Option<&str> {
        match self {
            Self::Published { external_id } => Some(external_id),
            _ => None,
        }
    }

    /// Reason recorded as `ListingStatus::Failed`, `None` for outcomes that
    /// are not failures of the listing itself.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Invalid(err) => Some(err.to_string()),
            Self::Auth(err) => Some(err.to_string()),
            Self::RateLimited { retry_after } => {
                Some(format!("rate limited; retry after {}s", retry_after.as_secs()))
            }
            Self::MarketplaceError { code, message, .. } => Some(format!("{code}: {message}")),
            Self::Storage(message) => Some(message.clone()),
            Self::Published { .. } | Self::Cancelled | Self::Unsupported => None,
        }
    }

    pub(crate) fn listing_status(&self) -> Option<ListingStatus> {
        match self {
            Self::Published { external_id } => Some(ListingStatus::published(external_id.clone())),
            other => other.failure_reason().map(ListingStatus::failed),
        }
    }

    pub(crate) fn from_terminal(result: PublishResult) -> Self {
        match result {
            PublishResult::Success(external_id) => Self::Published { external_id },
            PublishResult::RateLimited(retry_after) => Self::RateLimited { retry_after },
            PublishResult::AuthRejected => Self::Auth(AuthError::TokenRejected),
            PublishResult::MarketplaceError { code, message, retryable } => {
                Self::MarketplaceError { code, message, retryable }
            }
        }
    }
}

/// Outcomes of one publish call, one per requested marketplace.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReport {
    pub product_id: ProductId,
    pub correlation_id: CorrelationId,
    pub outcomes: BTreeMap<Marketplace, PublishOutcome>,
}

impl PublishReport {
    pub fn outcome(&self, marketplace: Marketplace) -> Option<&PublishOutcome> {
        self.outcomes.get(&marketplace)
    }

    pub fn all_published(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.values().all(PublishOutcome::is_published)
    }
}

/// One publisher call, logged as a structured event.
#[derive(Debug, Clone)]
pub struct PublishAttempt<'a> {
    pub correlation_id: CorrelationId,
    pub product_id: ProductId,
    pub marketplace: Marketplace,
    pub attempt: u32,
    pub at: DateTime<Utc>,
    pub result: &'a PublishResult,
}

impl PublishAttempt<'_> {
    pub fn outcome(&self) -> &'static str {
        match self.result {
            PublishResult::Success(_) => "success",
            PublishResult::RateLimited(_) => "rate_limited",
            PublishResult::AuthRejected => "auth_rejected",
            PublishResult::MarketplaceError { retryable: true, .. } => "retryable_error",
            PublishResult::MarketplaceError { .. } => "fatal_error",
        }
    }

    pub fn emit(&self) {
        let at = self.at.to_rfc3339();
        match self.result {
            PublishResult::Success(external_id) => tracing::info!(
                correlation_id = %self.correlation_id,
                product_id = %self.product_id,
                marketplace = %self.marketplace,
                attempt = self.attempt,
                at = %at,
                outcome = self.outcome(),
                external_id = %external_id,
                "publish attempt"
            ),
            PublishResult::RateLimited(retry_after) => tracing::warn!(
                correlation_id = %self.correlation_id,
                product_id = %self.product_id,
                marketplace = %self.marketplace,
                attempt = self.attempt,
                at = %at,
                outcome = self.outcome(),
                retry_after_secs = retry_after.as_secs(),
                "publish attempt"
            ),
            PublishResult::AuthRejected => tracing::warn!(
                correlation_id = %self.correlation_id,
                product_id = %self.product_id,
                marketplace = %self.marketplace,
                attempt = self.attempt,
                at = %at,
                outcome = self.outcome(),
                "publish attempt"
            ),
            PublishResult::MarketplaceError { code, message, .. } => tracing::warn!(
                correlation_id = %self.correlation_id,
                product_id = %self.product_id,
                marketplace = %self.marketplace,
                attempt = self.attempt,
                at = %at,
                outcome = self.outcome(),
                code = %code,
                error = %message,
                "publish attempt"
            ),
        }
    }
}
