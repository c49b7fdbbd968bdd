//! Per-marketplace publish branches.
//!
//! Each branch runs: lock the (product, marketplace) pair, mark the listing
//! pending, obtain a valid credential, map, publish with bounded retries,
//! then record the final listing status. Branches of one call run
//! concurrently and never affect each other's outcome.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crosslist_auth::{AuthError, CredentialSnapshot, CredentialStore, MarketplaceCredential};
use crosslist_catalog::{CatalogError, CatalogStore, Product};
use crosslist_core::{CorrelationId, Marketplace, ProductId};
use crosslist_listings::{MarketplacePayload, PublishResult};

use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::locks::ListingLocks;
use crate::outcome::{PublishAttempt, PublishOutcome, PublishReport};
use crate::recorder::ListingRecorder;
use crate::registry::{MarketplaceAdapter, MarketplaceRegistry};
use crate::retry::RetryState;

pub struct PublishOrchestrator {
    recorder: Arc<ListingRecorder>,
    credentials: Arc<CredentialStore>,
    registry: Arc<MarketplaceRegistry>,
    locks: ListingLocks,
    config: PublishConfig,
}

/// Identifies one branch in log events.
#[derive(Clone, Copy)]
struct Branch {
    correlation_id: CorrelationId,
    product_id: ProductId,
    marketplace: Marketplace,
}

impl PublishOrchestrator {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        credentials: Arc<CredentialStore>,
        registry: Arc<MarketplaceRegistry>,
        config: PublishConfig,
    ) -> Self {
        Self {
            recorder: Arc::new(ListingRecorder::new(catalog)),
            credentials,
            registry,
            locks: ListingLocks::new(),
            config,
        }
    }

    pub fn registry(&self) -> &MarketplaceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Publish `product_id` to each of `marketplaces` (duplicates ignored).
    ///
    /// Fails as a whole only when the product cannot be read; everything
    /// else is reported per marketplace.
    pub async fn publish_product(
        &self,
        product_id: ProductId,
        marketplaces: &[Marketplace],
        cancel: &CancellationToken,
    ) -> Result<PublishReport, PublishError> {
        self.recorder.product(product_id)?;

        let correlation_id = CorrelationId::new();
        let targets: BTreeSet<Marketplace> = marketplaces.iter().copied().collect();
        tracing::info!(
            correlation_id = %correlation_id,
            product_id = %product_id,
            marketplaces = ?targets,
            "publish requested"
        );

        let branches = targets.iter().map(|&marketplace| {
            let branch = Branch {
                correlation_id,
                product_id,
                marketplace,
            };
            async move { (marketplace, self.publish_branch(branch, cancel).await) }
        });
        let outcomes = join_all(branches).await.into_iter().collect();

        Ok(PublishReport {
            product_id,
            correlation_id,
            outcomes,
        })
    }

    async fn publish_branch(&self, branch: Branch, cancel: &CancellationToken) -> PublishOutcome {
        let Some(adapter) = self.registry.get(branch.marketplace) else {
            tracing::warn!(
                correlation_id = %branch.correlation_id,
                product_id = %branch.product_id,
                marketplace = %branch.marketplace,
                outcome = "unsupported",
                "no adapter registered for marketplace"
            );
            return PublishOutcome::Unsupported;
        };

        let _lock = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PublishOutcome::Cancelled,
            guard = self.locks.acquire(branch.product_id, branch.marketplace) => guard,
        };

        let pending = match self.recorder.begin(branch.product_id, branch.marketplace) {
            Ok(pending) => pending,
            Err(err) => return storage_outcome(branch, &err),
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = self.run(branch, adapter, pending.product()) => Some(outcome),
        };
        let Some(outcome) = outcome else {
            pending.revert();
            return PublishOutcome::Cancelled;
        };

        let Some(status) = outcome.listing_status() else {
            pending.revert();
            return outcome;
        };
        if let Err(err) = pending.finish(status) {
            tracing::error!(
                correlation_id = %branch.correlation_id,
                product_id = %branch.product_id,
                marketplace = %branch.marketplace,
                outcome = outcome.kind(),
                external_id = outcome.external_id(),
                error = %err,
                "publish finished but the catalog could not record it"
            );
            return PublishOutcome::Storage(err.to_string());
        }

        match &outcome {
            PublishOutcome::Published { external_id } => tracing::info!(
                correlation_id = %branch.correlation_id,
                product_id = %branch.product_id,
                marketplace = %branch.marketplace,
                outcome = outcome.kind(),
                external_id = %external_id,
                "listing published"
            ),
            failed => tracing::warn!(
                correlation_id = %branch.correlation_id,
                product_id = %branch.product_id,
                marketplace = %branch.marketplace,
                outcome = failed.kind(),
                reason = %failed.failure_reason().unwrap_or_default(),
                "listing failed"
            ),
        }
        outcome
    }

    async fn run(&self, branch: Branch, adapter: &MarketplaceAdapter, product: &Product) -> PublishOutcome {
        let credential = match self.valid_credential(branch, adapter).await {
            Ok(credential) => credential,
            Err(err) => return PublishOutcome::Auth(err),
        };

        let payload = match adapter.mapper.to_listing_payload(product) {
            Ok(payload) => payload,
            Err(err) => return PublishOutcome::Invalid(err),
        };

        self.publish_with_retry(branch, adapter, &payload, credential).await
    }

    async fn valid_credential(
        &self,
        branch: Branch,
        adapter: &MarketplaceAdapter,
    ) -> Result<CredentialSnapshot, AuthError> {
        let snapshot = self
            .credentials
            .snapshot(branch.marketplace)
            .map_err(|_| AuthError::Unauthenticated)?;
        if snapshot
            .credential
            .is_valid_at(Utc::now(), self.credentials.safety_margin())
        {
            return Ok(snapshot);
        }
        tracing::info!(
            correlation_id = %branch.correlation_id,
            marketplace = %branch.marketplace,
            "access token expired; refreshing"
        );
        self.refresh(branch, adapter, snapshot.generation).await
    }

    /// Refresh through the store's single-flight gate, retrying transient
    /// token-endpoint failures under the publish retry policy.
    async fn refresh(
        &self,
        branch: Branch,
        adapter: &MarketplaceAdapter,
        observed_generation: u64,
    ) -> Result<CredentialSnapshot, AuthError> {
        let mut retry = RetryState::new(self.config.retry.clone());
        loop {
            let attempt = retry.begin_attempt();
            let oauth = Arc::clone(&adapter.oauth);
            let timeout = self.config.call_timeout;
            let result = self
                .credentials
                .refresh_with(branch.marketplace, observed_generation, move |current: MarketplaceCredential| async move {
                    match tokio::time::timeout(timeout, oauth.refresh(&current)).await {
                        Ok(result) => result,
                        Err(_) => Err(AuthError::Transport(format!(
                            "token refresh timed out after {}s",
                            timeout.as_secs()
                        ))),
                    }
                })
                .await;

            match result {
                Err(err) if err.is_transient() => {
                    let Some(delay) = retry.next_delay(None) else {
                        return Err(err);
                    };
                    tracing::warn!(
                        correlation_id = %branch.correlation_id,
                        marketplace = %branch.marketplace,
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "token refresh failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn publish_with_retry(
        &self,
        branch: Branch,
        adapter: &MarketplaceAdapter,
        payload: &MarketplacePayload,
        mut credential: CredentialSnapshot,
    ) -> PublishOutcome {
        let mut retry = RetryState::new(self.config.retry.clone());
        let mut reauthorized = false;

        loop {
            let attempt = retry.begin_attempt();
            let result = self.call_publisher(adapter, payload, &credential.credential).await;
            PublishAttempt {
                correlation_id: branch.correlation_id,
                product_id: branch.product_id,
                marketplace: branch.marketplace,
                attempt,
                at: Utc::now(),
                result: &result,
            }
            .emit();

            let delay = match &result {
                PublishResult::Success(_) => None,
                PublishResult::AuthRejected if reauthorized => None,
                PublishResult::AuthRejected => {
                    reauthorized = true;
                    retry.refund();
                    credential = match self.refresh(branch, adapter, credential.generation).await {
                        Ok(refreshed) => refreshed,
                        Err(err) => return PublishOutcome::Auth(err),
                    };
                    continue;
                }
                PublishResult::RateLimited(retry_after) => retry.next_delay(Some(*retry_after)),
                PublishResult::MarketplaceError { retryable: true, .. } => retry.next_delay(None),
                PublishResult::MarketplaceError { .. } => None,
            };

            let Some(delay) = delay else {
                return PublishOutcome::from_terminal(result);
            };
            tracing::debug!(
                correlation_id = %branch.correlation_id,
                product_id = %branch.product_id,
                marketplace = %branch.marketplace,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying publish"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn call_publisher(
        &self,
        adapter: &MarketplaceAdapter,
        payload: &MarketplacePayload,
        credential: &MarketplaceCredential,
    ) -> PublishResult {
        let timeout = self.config.call_timeout;
        match tokio::time::timeout(timeout, adapter.publisher.publish(payload, credential)).await {
            Ok(result) => result,
            Err(_) => PublishResult::timeout(timeout),
        }
    }
}

fn storage_outcome(branch: Branch, err: &CatalogError) -> PublishOutcome {
    tracing::error!(
        correlation_id = %branch.correlation_id,
        product_id = %branch.product_id,
        marketplace = %branch.marketplace,
        error = %err,
        "could not mark listing pending"
    );
    PublishOutcome::Storage(err.to_string())
}

impl std::fmt::Debug for PublishOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishOrchestrator")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
