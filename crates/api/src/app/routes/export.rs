use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::IntoResponse,
};

use crosslist_catalog::{write_csv, CatalogStore};

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn export_catalog(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let products = match services.catalog.load() {
        Ok(p) => p,
        Err(e) => return errors::catalog_error_to_response(e),
    };

    let mut body = Vec::new();
    if let Err(e) = write_csv(&products, &mut body) {
        return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "export_error", e.to_string());
    }
    tracing::info!(products = products.len(), "catalog exported");

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"catalog.csv\""),
        ],
        body,
    )
        .into_response()
}
