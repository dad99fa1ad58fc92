use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::taxonomy::dtos::TaxonomyItemDto;
use crate::features::taxonomy::models::{TaxonomyItem, TaxonomyKind};
use crate::shared::types::PaginationQuery;

/// Column list shared by every taxonomy table
const COLUMNS: &str = "id, name, created_at, updated_at";

/// CRUD over the taxonomy tables; the kind selects the table
pub struct TaxonomyService {
    pool: PgPool,
}

impl TaxonomyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List entries ordered by name, optionally filtered by an ILIKE pattern
    pub async fn list(
        &self,
        kind: TaxonomyKind,
        pattern: Option<String>,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<TaxonomyItemDto>, i64)> {
        let table = kind.table();

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {table} WHERE ($1::TEXT IS NULL OR name ILIKE $1)"
        ))
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, TaxonomyItem>(&format!(
            "SELECT {COLUMNS} FROM {table} \
             WHERE ($1::TEXT IS NULL OR name ILIKE $1) \
             ORDER BY name LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list {}: {:?}", kind, e);
            AppError::Database(e)
        })?;

        Ok((items.into_iter().map(Into::into).collect(), total))
    }

    pub async fn get(&self, kind: TaxonomyKind, id: i64) -> Result<TaxonomyItemDto> {
        sqlx::query_as::<_, TaxonomyItem>(&format!(
            "SELECT {COLUMNS} FROM {} WHERE id = $1",
            kind.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Into::into)
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", kind.label(), id)))
    }

    pub async fn create(&self, kind: TaxonomyKind, name: &str) -> Result<TaxonomyItemDto> {
        let item = sqlx::query_as::<_, TaxonomyItem>(&format!(
            "INSERT INTO {} (name) VALUES ($1) RETURNING {COLUMNS}",
            kind.table()
        ))
        .bind(name.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, kind.label()))?;

        tracing::info!("{} created: id={}, name={}", kind.label(), item.id, item.name);
        Ok(item.into())
    }

    pub async fn update(&self, kind: TaxonomyKind, id: i64, name: &str) -> Result<TaxonomyItemDto> {
        sqlx::query_as::<_, TaxonomyItem>(&format!(
            "UPDATE {} SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING {COLUMNS}",
            kind.table()
        ))
        .bind(id)
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, kind.label()))?
        .map(Into::into)
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", kind.label(), id)))
    }

    /// Delete an entry; entries still referenced by a product cannot be removed
    pub async fn delete(&self, kind: TaxonomyKind, id: i64) -> Result<()> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match AppError::from_write(e, kind.label()) {
                AppError::Validation(_) => AppError::Conflict(format!(
                    "{} {} is still used by products",
                    kind.label(),
                    id
                )),
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "{} {} not found",
                kind.label(),
                id
            )));
        }

        tracing::info!("{} deleted: id={}", kind.label(), id);
        Ok(())
    }
}
