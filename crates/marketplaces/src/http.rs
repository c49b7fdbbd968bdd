//! Shared plumbing for marketplace REST calls.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

use crosslist_listings::{ClassificationTable, PublishResult, ResponseClass};

/// Client used by every adapter. The per-request timeout mirrors the
/// orchestrator's own deadline.
pub fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("crosslist/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// A fully read marketplace response.
#[derive(Debug, Clone)]
pub(crate) struct ApiReply {
    pub status: u16,
    pub retry_after: Option<Duration>,
    /// Parsed JSON body; `Null` when empty, a JSON string when not JSON.
    pub body: Value,
}

impl ApiReply {
    pub async fn read(response: Response) -> Result<Self, PublishResult> {
        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let bytes = response.bytes().await.map_err(transport_failure)?;

        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok(Self {
            status,
            retry_after,
            body,
        })
    }

    pub fn str_field(&self, key: &str) -> Option<String> {
        match self.body.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Error codes and a human-readable message pulled out of an error body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ErrorDetails {
    pub codes: Vec<String>,
    pub message: Option<String>,
}

/// Send `request` and read the reply; transport problems become retryable
/// publish failures.
pub(crate) async fn send(request: RequestBuilder) -> Result<ApiReply, PublishResult> {
    let response = request.send().await.map_err(transport_failure)?;
    ApiReply::read(response).await
}

/// `Ok(())` on a successful reply, otherwise the publish result that
/// `table` assigns to it.
pub(crate) fn check(
    reply: &ApiReply,
    table: &ClassificationTable,
    details: fn(&Value) -> ErrorDetails,
) -> Result<(), PublishResult> {
    let details = details(&reply.body);
    let class = table.classify(reply.status, details.codes.as_slice());
    let code = || {
        details
            .codes
            .first()
            .cloned()
            .unwrap_or_else(|| format!("http_{}", reply.status))
    };
    let message = || {
        details
            .message
            .clone()
            .unwrap_or_else(|| format!("marketplace answered HTTP {}", reply.status))
    };

    match class {
        ResponseClass::Success => Ok(()),
        ResponseClass::RateLimited => Err(PublishResult::RateLimited(
            reply.retry_after.unwrap_or(Duration::ZERO),
        )),
        ResponseClass::AuthRejected => Err(PublishResult::AuthRejected),
        ResponseClass::Retryable => Err(PublishResult::error(code(), message(), true)),
        ResponseClass::Fatal => Err(PublishResult::error(code(), message(), false)),
    }
}

pub(crate) fn transport_failure(err: reqwest::Error) -> PublishResult {
    if err.is_timeout() {
        PublishResult::error("timeout", err.to_string(), true)
    } else {
        PublishResult::transport(err.to_string())
    }
}

/// `Retry-After` in delta-seconds form.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

pub(crate) fn malformed(what: &str) -> PublishResult {
    PublishResult::error("malformed_response", format!("response is missing {what}"), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosslist_listings::{ClassificationRule, StatusRange};
    use reqwest::header::HeaderValue;

    const RULES: &[ClassificationRule] = &[
        ClassificationRule::status(StatusRange::SUCCESS, ResponseClass::Success),
        ClassificationRule::status(StatusRange::exactly(429), ResponseClass::RateLimited),
        ClassificationRule::status(StatusRange::SERVER_ERROR, ResponseClass::Retryable),
        ClassificationRule::status(StatusRange::CLIENT_ERROR, ResponseClass::Fatal),
    ];
    const TABLE: ClassificationTable = ClassificationTable::new(RULES, ResponseClass::Fatal);

    fn reply(status: u16, retry_after: Option<u64>) -> ApiReply {
        ApiReply {
            status,
            retry_after: retry_after.map(Duration::from_secs),
            body: Value::Null,
        }
    }

    fn no_details(_: &Value) -> ErrorDetails {
        ErrorDetails::default()
    }

    #[test]
    fn retry_after_seconds_are_parsed() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 12 "));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn rate_limit_carries_retry_after() {
        assert_eq!(
            check(&reply(429, Some(7)), &TABLE, no_details),
            Err(PublishResult::RateLimited(Duration::from_secs(7)))
        );
        assert_eq!(
            check(&reply(429, None), &TABLE, no_details),
            Err(PublishResult::RateLimited(Duration::ZERO))
        );
    }

    #[test]
    fn failures_fall_back_to_the_http_status_as_code() {
        assert_eq!(
            check(&reply(503, None), &TABLE, no_details),
            Err(PublishResult::error("http_503", "marketplace answered HTTP 503", true))
        );
        assert_eq!(
            check(&reply(404, None), &TABLE, no_details),
            Err(PublishResult::error("http_404", "marketplace answered HTTP 404", false))
        );
        assert_eq!(check(&reply(204, None), &TABLE, no_details), Ok(()));
    }

    #[test]
    fn string_and_numeric_fields_are_read_as_strings() {
        let reply = ApiReply {
            status: 200,
            retry_after: None,
            body: serde_json::json!({"listing_id": 123, "offerId": "abc", "nested": {}}),
        };
        assert_eq!(reply.str_field("listing_id").as_deref(), Some("123"));
        assert_eq!(reply.str_field("offerId").as_deref(), Some("abc"));
        assert_eq!(reply.str_field("nested"), None);
        assert_eq!(reply.str_field("missing"), None);
    }
}
