use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, Json};

use crate::app::dto::ConnectionView;
use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Registered marketplaces and whether each one is connected.
pub async fn marketplaces(Extension(services): Extension<Arc<AppServices>>) -> Json<Vec<ConnectionView>> {
    let views = services
        .orchestrator
        .registry()
        .marketplaces()
        .map(|marketplace| ConnectionView {
            marketplace,
            state: services.authorization.status(marketplace),
        })
        .collect();
    Json(views)
}
