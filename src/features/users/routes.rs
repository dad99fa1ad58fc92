use crate::features::users::handlers::user_handler;
use crate::features::users::services::UserService;
use axum::{routing::get, Router};
use std::sync::Arc;

pub fn routes(service: Arc<UserService>) -> Router {
    Router::new()
        .route("/api/user", get(user_handler::get_current_user))
        .with_state(service)
}
