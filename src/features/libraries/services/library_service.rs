use std::sync::Arc;

use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::libraries::dtos::{
    normalize_description, CreateLibraryDto, LibraryDto, UpdateLibraryDto,
};
use crate::features::libraries::models::{Library, LIBRARY_COLUMNS};
use crate::features::products::dtos::ProductSummaryDto;
use crate::features::products::ProductService;
use crate::features::users::UserService;
use crate::shared::types::PaginationQuery;

/// Caller-owned product collections
///
/// Libraries of other users read as missing.
pub struct LibraryService {
    pool: PgPool,
    users: Arc<UserService>,
    products: Arc<ProductService>,
}

impl LibraryService {
    pub fn new(pool: PgPool, users: Arc<UserService>, products: Arc<ProductService>) -> Self {
        Self {
            pool,
            users,
            products,
        }
    }

    pub async fn create(
        &self,
        caller: &AuthenticatedUser,
        dto: CreateLibraryDto,
    ) -> Result<LibraryDto> {
        self.users.ensure(caller).await?;

        let library = sqlx::query_as::<_, Library>(&format!(
            "INSERT INTO libraries (name, description, user_id) VALUES ($1, $2, $3) \
             RETURNING {LIBRARY_COLUMNS}"
        ))
        .bind(dto.name.trim())
        .bind(normalize_description(dto.description.as_deref()))
        .bind(&caller.sub)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, "Library"))?;

        tracing::info!("Library created: id={}, user={}", library.id, caller.sub);
        Ok(LibraryDto::new(library, 0))
    }

    pub async fn list(
        &self,
        caller: &AuthenticatedUser,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<LibraryDto>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM libraries WHERE user_id = $1")
            .bind(&caller.sub)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, LibraryRow>(
            r#"
            SELECT l.id, l.name, l.description, l.user_id, l.created_at, l.updated_at,
                   (SELECT COUNT(*) FROM library_product lp WHERE lp.library_id = l.id) AS product_count
            FROM libraries l
            WHERE l.user_id = $1
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&caller.sub)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    pub async fn get(&self, caller: &AuthenticatedUser, id: i64) -> Result<LibraryDto> {
        let library = self.owned(caller, id).await?;
        let count = self.product_count(id).await?;
        Ok(LibraryDto::new(library, count))
    }

    pub async fn update(
        &self,
        caller: &AuthenticatedUser,
        id: i64,
        dto: UpdateLibraryDto,
    ) -> Result<LibraryDto> {
        self.owned(caller, id).await?;

        let library = sqlx::query_as::<_, Library>(&format!(
            "UPDATE libraries \
             SET name = COALESCE($3, name), \
                 description = CASE WHEN $4 THEN $5 ELSE description END, \
                 updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {LIBRARY_COLUMNS}"
        ))
        .bind(id)
        .bind(&caller.sub)
        .bind(dto.name.as_deref().map(str::trim))
        .bind(dto.description.is_some())
        .bind(normalize_description(dto.description.as_deref()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, "Library"))?;

        let count = self.product_count(id).await?;
        tracing::info!("Library updated: id={}", id);
        Ok(LibraryDto::new(library, count))
    }

    pub async fn delete(&self, caller: &AuthenticatedUser, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM libraries WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(&caller.sub)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(library_not_found(id));
        }

        tracing::info!("Library deleted: id={}", id);
        Ok(())
    }

    /// Add a product the caller can see; returns false when it was already there
    pub async fn add_product(
        &self,
        caller: &AuthenticatedUser,
        id: i64,
        product_id: i64,
    ) -> Result<bool> {
        self.owned(caller, id).await?;
        self.products.visible(product_id, caller).await?;

        let result = sqlx::query(
            "INSERT INTO library_product (library_id, product_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(product_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, "Library product"))?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn remove_product(
        &self,
        caller: &AuthenticatedUser,
        id: i64,
        product_id: i64,
    ) -> Result<()> {
        self.owned(caller, id).await?;

        let result =
            sqlx::query("DELETE FROM library_product WHERE library_id = $1 AND product_id = $2")
                .bind(id)
                .bind(product_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Product {} is not in library {}",
                product_id, id
            )));
        }
        Ok(())
    }

    pub async fn list_products(
        &self,
        caller: &AuthenticatedUser,
        id: i64,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<ProductSummaryDto>, i64)> {
        self.owned(caller, id).await?;
        self.products.list_in_library(id, pagination).await
    }

    async fn owned(&self, caller: &AuthenticatedUser, id: i64) -> Result<Library> {
        sqlx::query_as::<_, Library>(&format!(
            "SELECT {LIBRARY_COLUMNS} FROM libraries WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(&caller.sub)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| library_not_found(id))
    }

    async fn product_count(&self, id: i64) -> Result<i64> {
        let count =
            sqlx::query_scalar("SELECT COUNT(*) FROM library_product WHERE library_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LibraryRow {
    #[sqlx(flatten)]
    library: Library,
    product_count: i64,
}

impl From<LibraryRow> for LibraryDto {
    fn from(row: LibraryRow) -> Self {
        LibraryDto::new(row.library, row.product_count)
    }
}

fn library_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Library {} not found", id))
}
