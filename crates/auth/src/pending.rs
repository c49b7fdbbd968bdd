//! Authorizations that have been started but not yet completed.
//!
//! Each authorization carries an opaque `state` (anti-forgery token) and a
//! PKCE verifier/challenge pair. A state is single use, bound to one
//! marketplace, and expires after a TTL.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crosslist_core::Marketplace;

use crate::oauth::AuthError;
use crate::secret::Secret;

/// PKCE (RFC 7636) S256 verifier and challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: Secret,
    pub challenge: String,
}

impl PkcePair {
    pub fn generate() -> Self {
        Self::from_verifier(random_token(32))
    }

    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier: Secret::new(verifier),
            challenge,
        }
    }
}

#[derive(Debug)]
struct Pending {
    marketplace: Marketplace,
    pkce: PkcePair,
    issued_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct PendingAuthorizations {
    entries: Mutex<HashMap<String, Pending>>,
    ttl: Duration,
}

impl Default for PendingAuthorizations {
    fn default() -> Self {
        Self::new(Duration::minutes(10))
    }
}

impl PendingAuthorizations {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Pending>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start an authorization for `marketplace`, returning its state token.
    pub fn issue(&self, marketplace: Marketplace) -> String {
        let now = Utc::now();
        let state = random_token(16);

        let mut entries = self.entries();
        entries.retain(|_, pending| now - pending.issued_at < self.ttl);
        entries.insert(
            state.clone(),
            Pending {
                marketplace,
                pkce: PkcePair::generate(),
                issued_at: now,
            },
        );
        state
    }

    /// PKCE challenge of a pending authorization, for building its URL.
    pub fn challenge(&self, marketplace: Marketplace, state: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let entries = self.entries();
        match entries.get(state) {
            Some(pending) if self.is_live(pending, marketplace, now) => Ok(pending.pkce.challenge.clone()),
            _ => Err(AuthError::InvalidState),
        }
    }

    /// Complete an authorization. The state is removed whether or not it
    /// validates, so it can never be replayed.
    pub fn consume(&self, marketplace: Marketplace, state: &str) -> Result<PkcePair, AuthError> {
        let now = Utc::now();
        let pending = self.entries().remove(state).ok_or(AuthError::InvalidState)?;
        if !self.is_live(&pending, marketplace, now) {
            tracing::warn!(%marketplace, "rejected authorization callback with mismatched or expired state");
            return Err(AuthError::InvalidState);
        }
        Ok(pending.pkce)
    }

    fn is_live(&self, pending: &Pending, marketplace: Marketplace, now: DateTime<Utc>) -> bool {
        pending.marketplace == marketplace && now - pending.issued_at < self.ttl
    }
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
