use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Router,
};

use crate::features::libraries::handlers;
use crate::features::libraries::services::LibraryService;

/// Every library route requires a caller
pub fn routes(service: Arc<LibraryService>) -> Router {
    Router::new()
        .route(
            "/api/libraries",
            get(handlers::list_libraries).post(handlers::create_library),
        )
        .route(
            "/api/libraries/{id}",
            get(handlers::get_library)
                .put(handlers::update_library)
                .patch(handlers::update_library)
                .delete(handlers::delete_library)
                .post(handlers::add_product),
        )
        .route(
            "/api/libraries/{id}/product",
            get(handlers::list_library_products),
        )
        .route(
            "/api/libraries/{id}/products/{product_id}",
            delete(handlers::remove_product),
        )
        .with_state(service)
}
