use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crosslist_auth::{AuthError, CredentialError};
use crosslist_catalog::CatalogError;
use crosslist_core::{DomainError, Marketplace, ProductId};
use crosslist_publishing::{AuthorizationError, PublishError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::UnknownMarketplace(name) => json_error(
            StatusCode::NOT_FOUND,
            "unknown_marketplace",
            format!("unknown marketplace: {name}"),
        ),
    }
}

pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    match err {
        CatalogError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("product {id} not found"))
        }
        CatalogError::Storage(msg) => {
            tracing::error!(error = %msg, "catalog storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg)
        }
    }
}

pub fn publish_error_to_response(err: PublishError) -> axum::response::Response {
    match err {
        PublishError::ProductNotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("product {id} not found"))
        }
        PublishError::Catalog(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg),
    }
}

pub fn authorization_error_to_response(err: AuthorizationError) -> axum::response::Response {
    match err {
        AuthorizationError::Unsupported(m) => json_error(
            StatusCode::NOT_FOUND,
            "unsupported_marketplace",
            format!("{m} is not configured"),
        ),
        AuthorizationError::Credential(CredentialError::NotFound(m)) => json_error(
            StatusCode::CONFLICT,
            "not_authenticated",
            format!("{m} is not connected; start at /auth/{m}"),
        ),
        AuthorizationError::Credential(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "credential_error", e.to_string())
        }
        AuthorizationError::Auth(e) => auth_error_to_response(e),
    }
}

fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        AuthError::InvalidState => json_error(StatusCode::BAD_REQUEST, "invalid_state", message),
        AuthError::ExchangeRejected(_) => json_error(StatusCode::BAD_REQUEST, "exchange_rejected", message),
        AuthError::Unauthenticated => json_error(StatusCode::CONFLICT, "not_authenticated", message),
        AuthError::RefreshExpired | AuthError::TokenRejected => {
            json_error(StatusCode::CONFLICT, "reauthorization_required", message)
        }
        AuthError::Transport(_) => json_error(StatusCode::BAD_GATEWAY, "marketplace_unavailable", message),
        AuthError::Misconfigured(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "misconfigured", message)
        }
    }
}

pub fn parse_product_id(s: &str) -> Result<ProductId, axum::response::Response> {
    s.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}

pub fn parse_marketplace(s: &str) -> Result<Marketplace, axum::response::Response> {
    s.parse().map_err(domain_error_to_response)
}
