use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::core::error::Result;
use crate::core::extractor::ValidatedJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::products::dtos::{
    ChangeStatusDto, CreateProductDto, ProductDetailDto, ProductDto, ProductFilterQuery,
    ProductSummaryDto, UpdateProductDto,
};
use crate::features::products::services::ProductService;
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// List approved public products
#[utoipa::path(
    get,
    path = "/api/products",
    params(PaginationQuery, ProductFilterQuery),
    responses(
        (status = 200, description = "Paginated products", body = ApiResponse<Vec<ProductSummaryDto>>),
    ),
    tag = "products"
)]
pub async fn list_products(
    State(service): State<Arc<ProductService>>,
    Query(pagination): Query<PaginationQuery>,
    Query(filter): Query<ProductFilterQuery>,
) -> Result<Json<ApiResponse<Vec<ProductSummaryDto>>>> {
    let (products, total) = service.list_public(&filter, &pagination).await?;
    Ok(Json(ApiResponse::success(
        Some(products),
        None,
        Some(Meta::paged(total, &pagination)),
    )))
}

/// List the caller's own products in any status
#[utoipa::path(
    get,
    path = "/api/products/user/list",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Caller's products", body = ApiResponse<Vec<ProductSummaryDto>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn list_my_products(
    user: AuthenticatedUser,
    State(service): State<Arc<ProductService>>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<ProductSummaryDto>>>> {
    let (products, total) = service.list_for_user(&user.sub, &pagination).await?;
    Ok(Json(ApiResponse::success(
        Some(products),
        None,
        Some(Meta::paged(total, &pagination)),
    )))
}

/// Get product detail
///
/// Products that are not public and approved are only visible to the owner and admins.
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found", body = ApiResponse<ProductDetailDto>),
        (status = 404, description = "Product not found")
    ),
    tag = "products"
)]
pub async fn get_product(
    user: Option<AuthenticatedUser>,
    State(service): State<Arc<ProductService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductDetailDto>>> {
    let product = service.get_detail(id, user.as_ref()).await?;
    Ok(Json(ApiResponse::success(Some(product), None, None)))
}

/// Create a product from staged uploads
///
/// The product row, its association links and its file rows are written in one
/// transaction. Files are copied into the catalog in the background after commit.
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductDto,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductDto>),
        (status = 400, description = "Validation error or unknown reference"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Creation rolled back")
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn create_product(
    user: AuthenticatedUser,
    State(service): State<Arc<ProductService>>,
    ValidatedJson(dto): ValidatedJson<CreateProductDto>,
) -> Result<(StatusCode, Json<ApiResponse<ProductDto>>)> {
    let product = service.create(&user, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(product),
            Some("Product created successfully".to_string()),
            None,
        )),
    ))
}

/// Update a product (owner only)
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = UpdateProductDto,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductDto>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn update_product(
    user: AuthenticatedUser,
    State(service): State<Arc<ProductService>>,
    Path(id): Path<i64>,
    ValidatedJson(dto): ValidatedJson<UpdateProductDto>,
) -> Result<Json<ApiResponse<ProductDto>>> {
    let product = service.update(&user, id, dto).await?;
    Ok(Json(ApiResponse::success(Some(product), None, None)))
}

/// Delete a product and its files (owner only)
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn delete_product(
    user: AuthenticatedUser,
    State(service): State<Arc<ProductService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(&user, id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Product deleted successfully".to_string()),
        None,
    )))
}

/// Move a product through the review workflow
#[utoipa::path(
    post,
    path = "/api/products/{id}/change-status",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = ChangeStatusDto,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<ProductDto>),
        (status = 403, description = "Neither owner nor admin"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn change_status(
    user: AuthenticatedUser,
    State(service): State<Arc<ProductService>>,
    Path(id): Path<i64>,
    ValidatedJson(dto): ValidatedJson<ChangeStatusDto>,
) -> Result<Json<ApiResponse<ProductDto>>> {
    let product = service.change_status(&user, id, dto.status).await?;
    Ok(Json(ApiResponse::success(Some(product), None, None)))
}
