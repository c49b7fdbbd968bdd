//! Process-wide store of marketplace credentials.
//!
//! Reads take a short `RwLock`; a refresh holds a per-marketplace async gate
//! so concurrent callers that find the same expired token perform one
//! refresh between them. Every write bumps a generation number, which lets a
//! caller tell whether the credential it observed has since been replaced.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{Duration, Utc};
use thiserror::Error;

use crosslist_core::Marketplace;

use crate::credential::{CredentialState, MarketplaceCredential};
use crate::oauth::AuthError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("no credential stored for {0}")]
    NotFound(Marketplace),

    #[error("credential for {actual} cannot be stored under {expected}")]
    MarketplaceMismatch {
        expected: Marketplace,
        actual: Marketplace,
    },
}

/// A credential together with the generation it was stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSnapshot {
    pub credential: MarketplaceCredential,
    pub generation: u64,
}

#[derive(Debug)]
struct Entry {
    credential: MarketplaceCredential,
    generation: u64,
}

#[derive(Debug)]
pub struct CredentialStore {
    entries: RwLock<HashMap<Marketplace, Entry>>,
    gates: Mutex<HashMap<Marketplace, Arc<tokio::sync::Mutex<()>>>>,
    generations: AtomicU64,
    safety_margin: Duration,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(Duration::seconds(60))
    }
}

impl CredentialStore {
    pub fn new(safety_margin: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
            safety_margin,
        }
    }

    pub fn safety_margin(&self) -> Duration {
        self.safety_margin
    }

    pub fn get(&self, marketplace: Marketplace) -> Result<MarketplaceCredential, CredentialError> {
        self.snapshot(marketplace).map(|s| s.credential)
    }

    pub fn snapshot(&self, marketplace: Marketplace) -> Result<CredentialSnapshot, CredentialError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&marketplace)
            .map(|entry| CredentialSnapshot {
                credential: entry.credential.clone(),
                generation: entry.generation,
            })
            .ok_or(CredentialError::NotFound(marketplace))
    }

    /// Replace the credential for `marketplace`.
    pub fn put(
        &self,
        marketplace: Marketplace,
        credential: MarketplaceCredential,
    ) -> Result<CredentialSnapshot, CredentialError> {
        if credential.marketplace() != marketplace {
            return Err(CredentialError::MarketplaceMismatch {
                expected: marketplace,
                actual: credential.marketplace(),
            });
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(self.insert(&mut entries, credential))
    }

    fn insert(
        &self,
        entries: &mut HashMap<Marketplace, Entry>,
        credential: MarketplaceCredential,
    ) -> CredentialSnapshot {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        entries.insert(
            credential.marketplace(),
            Entry {
                credential: credential.clone(),
                generation,
            },
        );
        CredentialSnapshot {
            credential,
            generation,
        }
    }

    /// True iff a credential is stored and its access token is usable now.
    pub fn is_valid(&self, marketplace: Marketplace) -> bool {
        self.get(marketplace)
            .is_ok_and(|c| c.is_valid_at(Utc::now(), self.safety_margin))
    }

    pub fn state(&self, marketplace: Marketplace) -> CredentialState {
        match self.get(marketplace) {
            Ok(credential) => credential.state_at(Utc::now(), self.safety_margin),
            Err(_) => CredentialState::Unauthenticated,
        }
    }

    /// Mark the stored credential revoked. Revoking a missing credential is a
    /// no-op.
    pub fn revoke(&self, marketplace: Marketplace) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(&marketplace) {
            let revoked = entry.credential.revoked();
            self.insert(&mut entries, revoked);
            tracing::warn!(%marketplace, "marketplace credential revoked");
        }
    }

    fn gate(&self, marketplace: Marketplace) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(marketplace).or_default())
    }

    /// Refresh the credential a caller observed at `observed_generation`.
    ///
    /// Callers for the same marketplace are serialized. A caller that gets
    /// the gate after another caller already replaced the observed
    /// credential with a valid one gets that credential back without calling
    /// `refresher`. A `RefreshExpired` answer revokes the stored credential.
    pub async fn refresh_with<F, Fut>(
        &self,
        marketplace: Marketplace,
        observed_generation: u64,
        refresher: F,
    ) -> Result<CredentialSnapshot, AuthError>
    where
        F: FnOnce(MarketplaceCredential) -> Fut,
        Fut: Future<Output = Result<MarketplaceCredential, AuthError>>,
    {
        let gate = self.gate(marketplace);
        let _held = gate.lock().await;

        let current = self
            .snapshot(marketplace)
            .map_err(|_| AuthError::Unauthenticated)?;
        let now = Utc::now();

        if current.generation != observed_generation
            && current.credential.is_valid_at(now, self.safety_margin)
        {
            tracing::debug!(%marketplace, generation = current.generation, "reusing concurrently refreshed credential");
            return Ok(current);
        }
        if current.credential.is_revoked() {
            return Err(AuthError::RefreshExpired);
        }
        if !current.credential.can_refresh(now) {
            return Err(AuthError::Unauthenticated);
        }

        tracing::info!(%marketplace, generation = current.generation, "refreshing marketplace access token");
        match refresher(current.credential.clone()).await {
            Ok(refreshed) => {
                if refreshed.marketplace() != marketplace {
                    return Err(AuthError::Misconfigured(format!(
                        "refresh for {marketplace} returned a {} credential",
                        refreshed.marketplace()
                    )));
                }
                let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
                match entries.get(&marketplace) {
                    // Replaced through `put` while the refresh was in flight.
                    Some(entry) if entry.generation != current.generation => Ok(CredentialSnapshot {
                        credential: entry.credential.clone(),
                        generation: entry.generation,
                    }),
                    _ => Ok(self.insert(&mut entries, refreshed)),
                }
            }
            Err(AuthError::RefreshExpired) => {
                let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
                if entries
                    .get(&marketplace)
                    .is_some_and(|entry| entry.generation == current.generation)
                {
                    self.insert(&mut entries, current.credential.revoked());
                    tracing::warn!(%marketplace, "refresh token rejected, credential revoked");
                }
                Err(AuthError::RefreshExpired)
            }
            Err(other) => {
                tracing::warn!(%marketplace, error = %other, "token refresh failed");
                Err(other)
            }
        }
    }
}
