use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crosslist_auth::MarketplaceCredential;
use crosslist_core::Marketplace;

use crate::payload::MarketplacePayload;

/// Result of one publish call.
///
/// Every HTTP response and transport failure maps to exactly one variant;
/// publishers never return raw transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishResult {
    /// The marketplace accepted the listing under this id.
    Success(String),
    RateLimited(Duration),
    /// The access token was refused.
    AuthRejected,
    MarketplaceError {
        code: String,
        message: String,
        retryable: bool,
    },
}

impl PublishResult {
    pub fn error(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self::MarketplaceError {
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }

    /// The call did not finish before its deadline.
    pub fn timeout(after: Duration) -> Self {
        Self::error("timeout", format!("no response within {}s", after.as_secs()), true)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::error("transport", message, true)
    }
}

/// Sends a mapped payload to a marketplace.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn marketplace(&self) -> Marketplace;

    async fn publish(&self, payload: &MarketplacePayload, credential: &MarketplaceCredential) -> PublishResult;
}
