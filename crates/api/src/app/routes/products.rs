use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crosslist_catalog::{CatalogStore, Product};

use crate::app::routes::publish;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/:id", get(get_product))
        .route("/:id/publish", post(publish::publish_product))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    let product = match Product::new(body.into()) {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let view = dto::ProductView::from(&product);
    let id = product.id();

    if let Err(e) = services.catalog.save(product) {
        return errors::catalog_error_to_response(e);
    }
    tracing::info!(product_id = %id, "product created");
    (StatusCode::CREATED, Json(view)).into_response()
}

pub async fn list_products(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.catalog.load() {
        Ok(products) => Json(products.iter().map(dto::ProductView::from).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.catalog.get(id) {
        Ok(product) => Json(dto::ProductView::from(&product)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
