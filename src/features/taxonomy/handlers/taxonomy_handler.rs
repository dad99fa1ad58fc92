use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::core::error::Result;
use crate::core::extractor::ValidatedJson;
use crate::features::auth::guards::RequireAdmin;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::taxonomy::dtos::{SearchQuery, TaxonomyItemDto, UpsertTaxonomyItemDto};
use crate::features::taxonomy::models::TaxonomyKind;
use crate::features::taxonomy::services::TaxonomyService;
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// Router state: the shared service plus the table this router serves
#[derive(Clone)]
pub struct TaxonomyState {
    pub service: Arc<TaxonomyService>,
    pub kind: TaxonomyKind,
}

/// List entries of a taxonomy table
#[utoipa::path(
    get,
    path = "/api/{kind}",
    params(
        ("kind" = TaxonomyKind, Path, description = "Taxonomy table"),
        PaginationQuery,
        SearchQuery,
    ),
    responses(
        (status = 200, description = "Paginated entries", body = ApiResponse<Vec<TaxonomyItemDto>>),
    ),
    tag = "taxonomy"
)]
pub async fn list_items(
    State(state): State<TaxonomyState>,
    Query(pagination): Query<PaginationQuery>,
    Query(search): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<TaxonomyItemDto>>>> {
    let (items, total) = state
        .service
        .list(state.kind, search.pattern(), &pagination)
        .await?;
    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta::paged(total, &pagination)),
    )))
}

/// Get a single entry
#[utoipa::path(
    get,
    path = "/api/{kind}/{id}",
    params(
        ("kind" = TaxonomyKind, Path, description = "Taxonomy table"),
        ("id" = i64, Path, description = "Entry ID")
    ),
    responses(
        (status = 200, description = "Entry found", body = ApiResponse<TaxonomyItemDto>),
        (status = 404, description = "Entry not found")
    ),
    security(("bearer_auth" = [])),
    tag = "taxonomy"
)]
pub async fn get_item(
    _user: AuthenticatedUser,
    State(state): State<TaxonomyState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<TaxonomyItemDto>>> {
    let item = state.service.get(state.kind, id).await?;
    Ok(Json(ApiResponse::success(Some(item), None, None)))
}

/// Create an entry (admin only)
#[utoipa::path(
    post,
    path = "/api/{kind}",
    params(("kind" = TaxonomyKind, Path, description = "Taxonomy table")),
    request_body = UpsertTaxonomyItemDto,
    responses(
        (status = 201, description = "Entry created", body = ApiResponse<TaxonomyItemDto>),
        (status = 403, description = "Admin access required"),
        (status = 409, description = "Name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "taxonomy"
)]
pub async fn create_item(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<TaxonomyState>,
    ValidatedJson(dto): ValidatedJson<UpsertTaxonomyItemDto>,
) -> Result<(StatusCode, Json<ApiResponse<TaxonomyItemDto>>)> {
    let item = state.service.create(state.kind, &dto.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(item), None, None)),
    ))
}

/// Rename an entry (admin only)
#[utoipa::path(
    put,
    path = "/api/{kind}/{id}",
    params(
        ("kind" = TaxonomyKind, Path, description = "Taxonomy table"),
        ("id" = i64, Path, description = "Entry ID")
    ),
    request_body = UpsertTaxonomyItemDto,
    responses(
        (status = 200, description = "Entry updated", body = ApiResponse<TaxonomyItemDto>),
        (status = 404, description = "Entry not found")
    ),
    security(("bearer_auth" = [])),
    tag = "taxonomy"
)]
pub async fn update_item(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<TaxonomyState>,
    Path(id): Path<i64>,
    ValidatedJson(dto): ValidatedJson<UpsertTaxonomyItemDto>,
) -> Result<Json<ApiResponse<TaxonomyItemDto>>> {
    let item = state.service.update(state.kind, id, &dto.name).await?;
    Ok(Json(ApiResponse::success(Some(item), None, None)))
}

/// Delete an entry (admin only)
#[utoipa::path(
    delete,
    path = "/api/{kind}/{id}",
    params(
        ("kind" = TaxonomyKind, Path, description = "Taxonomy table"),
        ("id" = i64, Path, description = "Entry ID")
    ),
    responses(
        (status = 200, description = "Entry deleted"),
        (status = 404, description = "Entry not found"),
        (status = 409, description = "Entry still referenced by products")
    ),
    security(("bearer_auth" = [])),
    tag = "taxonomy"
)]
pub async fn delete_item(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<TaxonomyState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    state.service.delete(state.kind, id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some(format!("{} deleted successfully", state.kind.label())),
        None,
    )))
}
