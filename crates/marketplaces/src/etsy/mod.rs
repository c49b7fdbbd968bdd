//! Etsy Open API v3 integration.

mod config;
mod mapper;
mod oauth;
mod publisher;

pub use config::{EtsyConfig, API_BASE, AUTHORIZE_URL, DEFAULT_SCOPES, TOKEN_URL};
pub use mapper::{EtsyDraft, EtsyListing, EtsyMapper};
pub use oauth::EtsyOAuthClient;
pub use publisher::EtsyPublisher;

use serde_json::Value;

use crosslist_listings::{ClassificationRule as Rule, ClassificationTable, ResponseClass, StatusRange};

use crate::http::ErrorDetails;

const RULES: &[Rule] = &[
    Rule::status(StatusRange::SUCCESS, ResponseClass::Success),
    Rule::status(StatusRange::exactly(429), ResponseClass::RateLimited),
    Rule::status(StatusRange::exactly(401), ResponseClass::AuthRejected),
    Rule::code(StatusRange::exactly(403), "invalid_token", ResponseClass::AuthRejected),
    Rule::status(StatusRange::exactly(408), ResponseClass::Retryable),
    Rule::status(StatusRange::SERVER_ERROR, ResponseClass::Retryable),
    Rule::status(StatusRange::CLIENT_ERROR, ResponseClass::Fatal),
];

pub(crate) const RESPONSES: ClassificationTable = ClassificationTable::new(RULES, ResponseClass::Fatal);

/// Etsy error bodies: `{"error": "..."}`, sometimes with an
/// `error_description`.
pub(crate) fn error_details(body: &Value) -> ErrorDetails {
    let error = body.get("error").and_then(Value::as_str).map(str::to_string);
    let description = body
        .get("error_description")
        .and_then(Value::as_str)
        .map(str::to_string);
    ErrorDetails {
        codes: error.iter().cloned().collect(),
        message: description.or(error),
    }
}
