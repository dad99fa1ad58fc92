use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::core::error::Result;
use crate::core::extractor::ValidatedJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::libraries::dtos::{
    AddProductDto, CreateLibraryDto, LibraryDto, UpdateLibraryDto,
};
use crate::features::libraries::services::LibraryService;
use crate::features::products::dtos::ProductSummaryDto;
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// Create a library
#[utoipa::path(
    post,
    path = "/api/libraries",
    request_body = CreateLibraryDto,
    responses(
        (status = 201, description = "Library created", body = ApiResponse<LibraryDto>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "libraries"
)]
pub async fn create_library(
    user: AuthenticatedUser,
    State(service): State<Arc<LibraryService>>,
    ValidatedJson(dto): ValidatedJson<CreateLibraryDto>,
) -> Result<(StatusCode, Json<ApiResponse<LibraryDto>>)> {
    let library = service.create(&user, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(library), None, None)),
    ))
}

/// List the caller's libraries
#[utoipa::path(
    get,
    path = "/api/libraries",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Caller's libraries", body = ApiResponse<Vec<LibraryDto>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "libraries"
)]
pub async fn list_libraries(
    user: AuthenticatedUser,
    State(service): State<Arc<LibraryService>>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<LibraryDto>>>> {
    let (libraries, total) = service.list(&user, &pagination).await?;
    Ok(Json(ApiResponse::success(
        Some(libraries),
        None,
        Some(Meta::paged(total, &pagination)),
    )))
}

#[utoipa::path(
    get,
    path = "/api/libraries/{id}",
    params(("id" = i64, Path, description = "Library ID")),
    responses(
        (status = 200, description = "Library found", body = ApiResponse<LibraryDto>),
        (status = 404, description = "Library not found")
    ),
    security(("bearer_auth" = [])),
    tag = "libraries"
)]
pub async fn get_library(
    user: AuthenticatedUser,
    State(service): State<Arc<LibraryService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<LibraryDto>>> {
    let library = service.get(&user, id).await?;
    Ok(Json(ApiResponse::success(Some(library), None, None)))
}

/// Update a library; served on both PUT and PATCH
#[utoipa::path(
    put,
    path = "/api/libraries/{id}",
    params(("id" = i64, Path, description = "Library ID")),
    request_body = UpdateLibraryDto,
    responses(
        (status = 200, description = "Library updated", body = ApiResponse<LibraryDto>),
        (status = 404, description = "Library not found")
    ),
    security(("bearer_auth" = [])),
    tag = "libraries"
)]
pub async fn update_library(
    user: AuthenticatedUser,
    State(service): State<Arc<LibraryService>>,
    Path(id): Path<i64>,
    ValidatedJson(dto): ValidatedJson<UpdateLibraryDto>,
) -> Result<Json<ApiResponse<LibraryDto>>> {
    let library = service.update(&user, id, dto).await?;
    Ok(Json(ApiResponse::success(Some(library), None, None)))
}

#[utoipa::path(
    delete,
    path = "/api/libraries/{id}",
    params(("id" = i64, Path, description = "Library ID")),
    responses(
        (status = 200, description = "Library deleted"),
        (status = 404, description = "Library not found")
    ),
    security(("bearer_auth" = [])),
    tag = "libraries"
)]
pub async fn delete_library(
    user: AuthenticatedUser,
    State(service): State<Arc<LibraryService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(&user, id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Library deleted successfully".to_string()),
        None,
    )))
}

/// Add a product to a library
///
/// Adding a product that is already in the library succeeds without change.
#[utoipa::path(
    post,
    path = "/api/libraries/{id}",
    params(("id" = i64, Path, description = "Library ID")),
    request_body = AddProductDto,
    responses(
        (status = 200, description = "Product is in the library"),
        (status = 404, description = "Library or product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "libraries"
)]
pub async fn add_product(
    user: AuthenticatedUser,
    State(service): State<Arc<LibraryService>>,
    Path(id): Path<i64>,
    ValidatedJson(dto): ValidatedJson<AddProductDto>,
) -> Result<Json<ApiResponse<()>>> {
    let added = service.add_product(&user, id, dto.product_id).await?;
    let message = if added {
        "Product added to library"
    } else {
        "Product already in library"
    };
    Ok(Json(ApiResponse::success(
        None,
        Some(message.to_string()),
        None,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/libraries/{id}/products/{product_id}",
    params(
        ("id" = i64, Path, description = "Library ID"),
        ("product_id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product removed"),
        (status = 404, description = "Library not found or product not in it")
    ),
    security(("bearer_auth" = [])),
    tag = "libraries"
)]
pub async fn remove_product(
    user: AuthenticatedUser,
    State(service): State<Arc<LibraryService>>,
    Path((id, product_id)): Path<(i64, i64)>,
) -> Result<Json<ApiResponse<()>>> {
    service.remove_product(&user, id, product_id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Product removed from library".to_string()),
        None,
    )))
}

/// List the products in a library
#[utoipa::path(
    get,
    path = "/api/libraries/{id}/product",
    params(("id" = i64, Path, description = "Library ID"), PaginationQuery),
    responses(
        (status = 200, description = "Products in the library", body = ApiResponse<Vec<ProductSummaryDto>>),
        (status = 404, description = "Library not found")
    ),
    security(("bearer_auth" = [])),
    tag = "libraries"
)]
pub async fn list_library_products(
    user: AuthenticatedUser,
    State(service): State<Arc<LibraryService>>,
    Path(id): Path<i64>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<ProductSummaryDto>>>> {
    let (products, total) = service.list_products(&user, id, &pagination).await?;
    Ok(Json(ApiResponse::success(
        Some(products),
        None,
        Some(Meta::paged(total, &pagination)),
    )))
}
