use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crosslist_core::Marketplace;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Publish one product. Always answers 200 once the product exists; each
/// marketplace's result is in the body.
///
/// An empty body publishes to every registered marketplace. A body that is
/// not a valid request is rejected with 400 and nothing is published.
pub async fn publish_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Bytes,
) -> axum::response::Response {
    let id = match errors::parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(resp) => return resp,
    };
    let marketplaces: Vec<Marketplace> = if request.marketplaces.is_empty() {
        services.orchestrator.registry().marketplaces().collect()
    } else {
        request.marketplaces
    };

    // A client disconnect drops this future; pending listings are restored
    // by the orchestrator's guards.
    let cancel = services.shutdown.child_token();
    match services.orchestrator.publish_product(id, &marketplaces, &cancel).await {
        Ok(report) => Json(dto::PublishReportView::from(&report)).into_response(),
        Err(e) => errors::publish_error_to_response(e),
    }
}

fn parse_request(body: &[u8]) -> Result<dto::PublishRequest, axum::response::Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(dto::PublishRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", format!("invalid publish request: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_means_every_marketplace() {
        assert!(parse_request(b"").unwrap().marketplaces.is_empty());
        assert!(parse_request(b"  \n").unwrap().marketplaces.is_empty());
        assert!(parse_request(b"{}").unwrap().marketplaces.is_empty());
    }

    #[test]
    fn names_are_parsed() {
        let request = parse_request(br#"{"marketplaces": ["etsy"]}"#).unwrap();
        assert_eq!(request.marketplaces, vec![Marketplace::Etsy]);
    }

    #[test]
    fn malformed_requests_are_rejected() {
        for body in [
            &br#"{"marketplaces": ["etsyy"]}"#[..],
            &br#"{"marketplace": ["etsy"]}"#[..],
            &b"etsy"[..],
            &b"{"[..],
        ] {
            let resp = parse_request(body).unwrap_err();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
    }
}
