//! eBay Sell Inventory API integration.

mod config;
mod mapper;
mod oauth;
mod publisher;

pub use config::{EbayConfig, EbayEnvironment, EbayPolicies, UnknownEnvironment, DEFAULT_SCOPES};
pub use mapper::{EbayListing, EbayMapper};
pub use oauth::EbayOAuthClient;
pub use publisher::EbayPublisher;

use serde_json::Value;

use crosslist_listings::{ClassificationRule as Rule, ClassificationTable, ResponseClass, StatusRange};

use crate::http::ErrorDetails;

const RULES: &[Rule] = &[
    Rule::status(StatusRange::SUCCESS, ResponseClass::Success),
    Rule::status(StatusRange::exactly(429), ResponseClass::RateLimited),
    // "Too many requests", sent with a 4xx status by some Sell API calls.
    Rule::code(StatusRange::CLIENT_ERROR, "2001", ResponseClass::RateLimited),
    Rule::status(StatusRange::exactly(401), ResponseClass::AuthRejected),
    // Invalid access token.
    Rule::code(StatusRange::CLIENT_ERROR, "1001", ResponseClass::AuthRejected),
    // System error; eBay asks callers to retry.
    Rule::code(StatusRange::CLIENT_ERROR, "25001", ResponseClass::Retryable),
    Rule::status(StatusRange::SERVER_ERROR, ResponseClass::Retryable),
    Rule::status(StatusRange::CLIENT_ERROR, ResponseClass::Fatal),
];

pub(crate) const RESPONSES: ClassificationTable = ClassificationTable::new(RULES, ResponseClass::Fatal);

/// Offer already exists for the SKU; the payload names the existing offer.
pub(crate) const OFFER_EXISTS: &str = "25002";

/// eBay error bodies: `{"errors": [{"errorId": 25002, "message": "...", ...}]}`.
pub(crate) fn error_details(body: &Value) -> ErrorDetails {
    let errors = body.get("errors").and_then(Value::as_array);
    let codes = errors
        .into_iter()
        .flatten()
        .filter_map(|e| e.get("errorId"))
        .filter_map(|id| match id {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect();
    let message = errors
        .and_then(|e| e.first())
        .and_then(|e| e.get("longMessage").or_else(|| e.get("message")))
        .and_then(Value::as_str)
        .map(str::to_string);
    ErrorDetails { codes, message }
}
