use thiserror::Error;

use crosslist_auth::{AuthError, CredentialError};
use crosslist_catalog::CatalogError;
use crosslist_core::{Marketplace, ProductId};

/// Failure of a whole publish call. Per-marketplace failures are reported
/// as outcomes instead.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("catalog unavailable: {0}")]
    Catalog(String),
}

impl From<CatalogError> for PublishError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => Self::ProductNotFound(id),
            CatalogError::Storage(message) => Self::Catalog(message),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("adapter parts disagree: {publisher} publisher with {other} {part}")]
    MismatchedParts {
        publisher: Marketplace,
        other: Marketplace,
        part: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("marketplace not supported: {0}")]
    Unsupported(Marketplace),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}
