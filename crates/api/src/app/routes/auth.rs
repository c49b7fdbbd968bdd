use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Json,
};

use crate::app::dto::{CallbackQuery, ConnectionView};
use crate::app::errors;
use crate::app::services::AppServices;

/// Send the seller to the marketplace's consent page.
pub async fn start(
    Extension(services): Extension<Arc<AppServices>>,
    Path(marketplace): Path<String>,
) -> axum::response::Response {
    let marketplace = match errors::parse_marketplace(&marketplace) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    match services.authorization.begin(marketplace) {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(e) => errors::authorization_error_to_response(e),
    }
}

pub async fn callback(
    Extension(services): Extension<Arc<AppServices>>,
    Path(marketplace): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> axum::response::Response {
    let marketplace = match errors::parse_marketplace(&marketplace) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    if let Some(error) = query.error {
        tracing::warn!(marketplace = %marketplace, error = %error, "seller declined authorization");
        let message = query.error_description.unwrap_or(error);
        return errors::json_error(StatusCode::BAD_REQUEST, "authorization_denied", message);
    }
    let (Some(code), Some(state)) = (query.code, query.state) else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_callback",
            "callback requires code and state",
        );
    };

    match services.authorization.complete(marketplace, &code, &state).await {
        Ok(state) => Json(ConnectionView { marketplace, state }).into_response(),
        Err(e) => errors::authorization_error_to_response(e),
    }
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Path(marketplace): Path<String>,
) -> axum::response::Response {
    let marketplace = match errors::parse_marketplace(&marketplace) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    match services.authorization.refresh(marketplace).await {
        Ok(state) => Json(ConnectionView { marketplace, state }).into_response(),
        Err(e) => errors::authorization_error_to_response(e),
    }
}
