use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::products::handlers;
use crate::features::products::services::ProductService;

pub fn routes(service: Arc<ProductService>) -> Router {
    Router::new()
        .route(
            "/api/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/api/products/user/list", get(handlers::list_my_products))
        .route(
            "/api/products/{id}",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/api/products/{id}/change-status",
            post(handlers::change_status),
        )
        .with_state(service)
}
