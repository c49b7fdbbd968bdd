use axum::{
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod export;
pub mod products;
pub mod publish;
pub mod system;

/// Router for every endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .route("/marketplaces", get(system::marketplaces))
        .route("/auth/:marketplace", get(auth::start))
        .route("/auth/:marketplace/refresh", post(auth::refresh))
        .route("/callback/:marketplace", get(auth::callback))
        .nest("/products", products::router())
        .route("/catalog/export", get(export::export_catalog))
}
