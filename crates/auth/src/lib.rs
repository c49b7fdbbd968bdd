//! `crosslist-auth`: marketplace OAuth credentials and the capability every
//! marketplace OAuth client implements.
//!
//! This crate performs no network IO; concrete clients live in
//! `crosslist-marketplaces`.

pub mod credential;
pub mod oauth;
pub mod pending;
pub mod secret;
pub mod store;

pub use credential::{ClientCredentials, CredentialState, MarketplaceCredential, TokenGrant};
pub use oauth::{AuthError, OAuthClient};
pub use pending::{PendingAuthorizations, PkcePair};
pub use secret::Secret;
pub use store::{CredentialError, CredentialSnapshot, CredentialStore};
