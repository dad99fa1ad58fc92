use axum::{extract::DefaultBodyLimit, routing::post, Router};

use crate::features::files::handlers::{upload_temp_image, upload_temp_model, FilesState};

/// Multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create routes for the files feature
pub fn routes(state: FilesState) -> Router {
    Router::new()
        .route(
            "/api/upload-temp-images",
            post(upload_temp_image)
                .layer(DefaultBodyLimit::max(state.max_image_size + MULTIPART_OVERHEAD)),
        )
        .route(
            "/api/upload-temp-model",
            post(upload_temp_model)
                .layer(DefaultBodyLimit::max(state.max_model_size + MULTIPART_OVERHEAD)),
        )
        .with_state(state)
}
