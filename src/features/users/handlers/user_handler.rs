use crate::core::error::Result;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::users::dtos::UserDto;
use crate::features::users::services::UserService;
use crate::shared::types::ApiResponse;
use axum::{extract::State, Json};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_current_user(
    user: AuthenticatedUser,
    State(service): State<Arc<UserService>>,
) -> Result<Json<ApiResponse<UserDto>>> {
    let row = service.ensure(&user).await?;
    Ok(Json(ApiResponse::success(
        Some(UserDto::new(row, user.roles)),
        None,
        None,
    )))
}
