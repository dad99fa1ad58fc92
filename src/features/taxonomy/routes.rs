use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::taxonomy::handlers::{self, TaxonomyState};
use crate::features::taxonomy::models::TaxonomyKind;
use crate::features::taxonomy::services::TaxonomyService;

/// Create routes for every taxonomy table
///
/// Listing is public; reads of single entries require a caller and writes require admin.
pub fn routes(service: Arc<TaxonomyService>) -> Router {
    TaxonomyKind::ALL
        .into_iter()
        .fold(Router::new(), |router, kind| {
            let state = TaxonomyState {
                service: Arc::clone(&service),
                kind,
            };
            let collection = format!("/api/{}", kind.table());
            let member = format!("/api/{}/{{id}}", kind.table());

            router.merge(
                Router::new()
                    .route(&collection, get(handlers::list_items).post(handlers::create_item))
                    .route(
                        &member,
                        get(handlers::get_item)
                            .put(handlers::update_item)
                            .delete(handlers::delete_item),
                    )
                    .with_state(state),
            )
        })
}
