use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    is_image_type_allowed, is_model_extension_allowed, TempUploadDto, TempUploadResponseDto,
    ALLOWED_IMAGE_MIME_TYPES, ALLOWED_MODEL_EXTENSIONS,
};
use crate::features::files::models::FileCategory;
use crate::features::files::services::file_service::sanitize_file_name;
use crate::features::files::services::FileService;
use crate::shared::types::ApiResponse;

#[derive(Clone)]
pub struct FilesState {
    pub service: Arc<FileService>,
    pub max_image_size: usize,
    pub max_model_size: usize,
}

struct UploadedPart {
    data: Vec<u8>,
    file_name: String,
    content_type: String,
}

/// Read the `file` field; other fields are ignored
async fn read_file_field(mut multipart: Multipart) -> Result<UploadedPart, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != "file" {
            debug!("Ignoring unknown field: {}", field_name);
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let file_name = sanitize_file_name(field.file_name().unwrap_or("unnamed"));
        let data = field.bytes().await.map_err(|e| {
            debug!("Failed to read file bytes: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;

        return Ok(UploadedPart {
            data: data.to_vec(),
            file_name,
            content_type,
        });
    }

    Err(AppError::BadRequest("File is required".to_string()))
}

fn check_size(part: &UploadedPart, max: usize) -> Result<(), AppError> {
    if part.data.len() > max {
        return Err(AppError::BadRequest(format!(
            "File too large. Maximum size is {} bytes ({} MB)",
            max,
            max / 1024 / 1024
        )));
    }
    Ok(())
}

/// Stage an image for a product
#[utoipa::path(
    post,
    path = "/api/upload-temp-images",
    tag = "files",
    request_body(content = TempUploadDto, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image staged", body = ApiResponse<TempUploadResponseDto>),
        (status = 400, description = "Invalid file"),
        (status = 401, description = "Authentication required"),
        (status = 413, description = "File too large")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_temp_image(
    user: AuthenticatedUser,
    State(state): State<FilesState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<TempUploadResponseDto>>), AppError> {
    let part = read_file_field(multipart).await?;
    check_size(&part, state.max_image_size)?;

    if !is_image_type_allowed(&part.content_type) {
        return Err(AppError::BadRequest(format!(
            "File type '{}' is not allowed. Allowed types: {}",
            part.content_type,
            ALLOWED_IMAGE_MIME_TYPES.join(", ")
        )));
    }

    let response = state
        .service
        .upload_temp(
            part.data,
            &part.file_name,
            &part.content_type,
            FileCategory::Images,
            &user.sub,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(response), None, None)),
    ))
}

/// Stage a 3D model for a product
#[utoipa::path(
    post,
    path = "/api/upload-temp-model",
    tag = "files",
    request_body(content = TempUploadDto, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Model staged", body = ApiResponse<TempUploadResponseDto>),
        (status = 400, description = "Invalid file"),
        (status = 401, description = "Authentication required"),
        (status = 413, description = "File too large")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_temp_model(
    user: AuthenticatedUser,
    State(state): State<FilesState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<TempUploadResponseDto>>), AppError> {
    let part = read_file_field(multipart).await?;
    check_size(&part, state.max_model_size)?;

    if !is_model_extension_allowed(&part.file_name) {
        return Err(AppError::BadRequest(format!(
            "Model '{}' has an unsupported extension. Allowed: {}",
            part.file_name,
            ALLOWED_MODEL_EXTENSIONS.join(", ")
        )));
    }

    let response = state
        .service
        .upload_temp(
            part.data,
            &part.file_name,
            &part.content_type,
            FileCategory::Models,
            &user.sub,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(response), None, None)),
    ))
}
