use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::FileDto;
use crate::features::files::FileService;
use crate::features::products::dtos::{
    CreateProductDto, ProductDetailDto, ProductDto, ProductFilterQuery, ProductSummaryDto,
    UpdateProductDto,
};
use crate::features::products::models::{
    AssociationKind, Product, ProductStatus, PRODUCT_COLUMNS,
};
use crate::features::products::services::association_manager;
use crate::features::products::services::creation_workflow::ProductCreationWorkflow;
use crate::features::taxonomy::dtos::TaxonomyItemDto;
use crate::features::taxonomy::{TaxonomyItem, TaxonomyKind};
use crate::features::users::UserService;
use crate::modules::catalog_store::{CatalogStore, CatalogTx, PgCatalogStore, PgCatalogTx};
use crate::shared::types::PaginationQuery;

/// List query shared by the public and per-user listings; `{where}` is filled in per caller
const SUMMARY_SELECT: &str = r#"
    SELECT p.id, p.name, p.category_id, c.name AS category_name, p.user_id, p.public,
           p.status, p.created_at, thumb.file_path AS thumbnail_path
    FROM products p
    JOIN categories c ON c.id = p.category_id
    LEFT JOIN LATERAL (
        SELECT f.file_path
        FROM product_files pf
        JOIN files f ON f.id = pf.file_id
        WHERE pf.product_id = p.id AND pf.is_thumbnail = TRUE AND f.stored_at IS NOT NULL
        ORDER BY pf.id
        LIMIT 1
    ) thumb ON TRUE
"#;

const PUBLIC_FILTER: &str = "p.public = TRUE AND p.status = 'APPROVED' \
     AND ($1::BIGINT IS NULL OR p.category_id = $1) \
     AND ($2::BIGINT IS NULL OR p.platform_id = $2) \
     AND ($3::BIGINT IS NULL OR p.render_id = $3) \
     AND ($4::TEXT IS NULL OR p.name ILIKE $4)";

#[derive(Debug, FromRow)]
struct ProductSummaryRow {
    id: i64,
    name: String,
    category_id: i64,
    category_name: String,
    user_id: String,
    public: bool,
    status: ProductStatus,
    created_at: DateTime<Utc>,
    thumbnail_path: Option<String>,
}

/// A product file joined with its link flags
#[derive(Debug, Clone, FromRow)]
struct ProductFileRow {
    id: i64,
    file_name: String,
    file_path: String,
    stored_at: Option<DateTime<Utc>>,
    is_model: Option<bool>,
}

/// Split into model and image files; a link with no model flag counts as an image
fn split_files(rows: Vec<ProductFileRow>) -> (Vec<ProductFileRow>, Vec<ProductFileRow>) {
    rows.into_iter().partition(|row| row.is_model == Some(true))
}

pub struct ProductService {
    store: PgCatalogStore,
    workflow: ProductCreationWorkflow<PgCatalogStore>,
    users: Arc<UserService>,
    files: Arc<FileService>,
}

impl ProductService {
    pub fn new(
        store: PgCatalogStore,
        workflow: ProductCreationWorkflow<PgCatalogStore>,
        users: Arc<UserService>,
        files: Arc<FileService>,
    ) -> Self {
        Self {
            store,
            workflow,
            users,
            files,
        }
    }

    /// Approved public products
    pub async fn list_public(
        &self,
        filter: &ProductFilterQuery,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<ProductSummaryDto>, i64)> {
        let pattern = filter.pattern();

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM products p WHERE {PUBLIC_FILTER}"
        ))
        .bind(filter.category_id)
        .bind(filter.platform_id)
        .bind(filter.render_id)
        .bind(&pattern)
        .fetch_one(self.store.pool())
        .await?;

        let rows = sqlx::query_as::<_, ProductSummaryRow>(&format!(
            "{SUMMARY_SELECT} WHERE {PUBLIC_FILTER} \
             ORDER BY p.created_at DESC, p.id DESC LIMIT $5 OFFSET $6"
        ))
        .bind(filter.category_id)
        .bind(filter.platform_id)
        .bind(filter.render_id)
        .bind(&pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(self.store.pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to list products: {:?}", e);
            AppError::Database(e)
        })?;

        Ok((self.summaries(rows), total))
    }

    /// All of one user's products, any status
    pub async fn list_for_user(
        &self,
        user_id: &str,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<ProductSummaryDto>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.store.pool())
            .await?;

        let rows = sqlx::query_as::<_, ProductSummaryRow>(&format!(
            "{SUMMARY_SELECT} WHERE p.user_id = $1 \
             ORDER BY p.created_at DESC, p.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(self.store.pool())
        .await?;

        Ok((self.summaries(rows), total))
    }

    /// Product detail; unpublished products are only visible to their owner and admins
    pub async fn get_detail(
        &self,
        id: i64,
        caller: Option<&AuthenticatedUser>,
    ) -> Result<ProductDetailDto> {
        let relations = self.store.load_with_relations(id).await?;
        let product = relations.product;
        check_visible(&product, caller)?;

        let category = self
            .taxonomy_item(TaxonomyKind::Categories, product.category_id)
            .await?;
        let platform = match product.platform_id {
            Some(platform_id) => Some(
                self.taxonomy_item(TaxonomyKind::Platforms, platform_id)
                    .await?,
            ),
            None => None,
        };
        let render = match product.render_id {
            Some(render_id) => Some(self.taxonomy_item(TaxonomyKind::Renders, render_id).await?),
            None => None,
        };

        let rows = sqlx::query_as::<_, ProductFileRow>(
            r#"
            SELECT f.id, f.file_name, f.file_path, f.stored_at, pf.is_model
            FROM product_files pf
            JOIN files f ON f.id = pf.file_id
            WHERE pf.product_id = $1
            ORDER BY pf.id
            "#,
        )
        .bind(id)
        .fetch_all(self.store.pool())
        .await?;
        let (models, images) = split_files(rows);

        Ok(ProductDetailDto {
            id: product.id,
            name: product.name,
            user_id: product.user_id,
            public: product.public,
            status: product.status,
            category,
            platform,
            render,
            colors: relations.colors.into_iter().map(Into::into).collect(),
            materials: relations.materials.into_iter().map(Into::into).collect(),
            tags: relations.tags.into_iter().map(Into::into).collect(),
            model_files: models.into_iter().map(|row| self.file_dto(row)).collect(),
            image_files: images.into_iter().map(|row| self.file_dto(row)).collect(),
            created_at: product.created_at,
            updated_at: product.updated_at,
        })
    }

    /// Fetch a product the caller is allowed to see
    pub async fn visible(&self, id: i64, caller: &AuthenticatedUser) -> Result<Product> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.store.pool())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))?;

        check_visible(&product, Some(caller))?;
        Ok(product)
    }

    /// Products collected in a library, most recently added first
    pub async fn list_in_library(
        &self,
        library_id: i64,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<ProductSummaryDto>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM library_product WHERE library_id = $1")
                .bind(library_id)
                .fetch_one(self.store.pool())
                .await?;

        let rows = sqlx::query_as::<_, ProductSummaryRow>(&format!(
            "{SUMMARY_SELECT} JOIN library_product lp ON lp.product_id = p.id \
             WHERE lp.library_id = $1 \
             ORDER BY lp.created_at DESC, p.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(library_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(self.store.pool())
        .await?;

        Ok((self.summaries(rows), total))
    }

    pub async fn create(
        &self,
        caller: &AuthenticatedUser,
        dto: CreateProductDto,
    ) -> Result<ProductDto> {
        self.users.ensure(caller).await?;
        let created = self.workflow.create(&dto.into(), &caller.sub).await?;
        Ok(created.into())
    }

    /// Owner-only update of scalar fields and association sets
    pub async fn update(
        &self,
        caller: &AuthenticatedUser,
        id: i64,
        dto: UpdateProductDto,
    ) -> Result<ProductDto> {
        let mut tx = self.store.begin().await?;
        let product = lock_product(&mut tx, id).await?;
        if product.user_id != caller.sub {
            return Err(AppError::Forbidden(
                "Only the owner can edit this product".to_string(),
            ));
        }

        sqlx::query(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                category_id = COALESCE($3, category_id),
                platform_id = COALESCE($4, platform_id),
                render_id = COALESCE($5, render_id),
                public = COALESCE($6, public),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(dto.name.as_deref().map(str::trim))
        .bind(dto.category_id)
        .bind(dto.platform_id)
        .bind(dto.render_id)
        .bind(dto.public)
        .execute(tx.conn())
        .await
        .map_err(|e| AppError::from_write(e, "Product"))?;

        let associations = [
            (AssociationKind::Colors, &dto.color_ids),
            (AssociationKind::Materials, &dto.material_ids),
            (AssociationKind::Tags, &dto.tag_ids),
        ];
        for (kind, ids) in associations {
            if let Some(ids) = ids {
                association_manager::sync(&mut tx, kind, id, ids).await?;
            }
        }

        tx.commit().await?;
        tracing::info!("Product updated: id={}, by={}", id, caller.sub);

        Ok(self.store.load_with_relations(id).await?.into())
    }

    /// Owner-only delete of the product, its links and its file rows
    ///
    /// Stored objects are removed after commit on a best-effort basis.
    pub async fn delete(&self, caller: &AuthenticatedUser, id: i64) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let product = lock_product(&mut tx, id).await?;
        if product.user_id != caller.sub {
            return Err(AppError::Forbidden(
                "Only the owner can delete this product".to_string(),
            ));
        }

        let file_ids: Vec<i64> =
            sqlx::query_scalar("SELECT file_id FROM product_files WHERE product_id = $1")
                .bind(id)
                .fetch_all(tx.conn())
                .await?;

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(tx.conn())
            .await?;

        let removed: Vec<String> =
            sqlx::query_scalar("DELETE FROM files WHERE id = ANY($1) RETURNING file_path")
                .bind(&file_ids)
                .fetch_all(tx.conn())
                .await?;

        // Paths are derived from display names, so another product may share an object
        let shared: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT file_path FROM files WHERE file_path = ANY($1)")
                .bind(&removed)
                .fetch_all(tx.conn())
                .await?;
        let paths = unshared_paths(removed, &shared);

        tx.commit().await?;
        tracing::info!(
            "Product deleted: id={}, files={}, by={}",
            id,
            paths.len(),
            caller.sub
        );

        self.files.delete_stored(&paths).await;
        Ok(())
    }

    pub async fn change_status(
        &self,
        caller: &AuthenticatedUser,
        id: i64,
        to: ProductStatus,
    ) -> Result<ProductDto> {
        let mut tx = self.store.begin().await?;
        let product = lock_product(&mut tx, id).await?;

        let is_owner = product.user_id == caller.sub;
        let is_admin = caller.is_admin();
        if !is_owner && !is_admin {
            return Err(AppError::Forbidden(
                "Only the owner or an admin can change this product's status".to_string(),
            ));
        }
        if !product.status.can_transition(to, is_owner, is_admin) {
            return Err(AppError::Conflict(format!(
                "Cannot move product {} from {} to {}",
                id, product.status, to
            )));
        }

        sqlx::query("UPDATE products SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(to)
            .execute(tx.conn())
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Product {} status {} -> {} by {}",
            id,
            product.status,
            to,
            caller.sub
        );

        Ok(self.store.load_with_relations(id).await?.into())
    }

    async fn taxonomy_item(&self, kind: TaxonomyKind, id: i64) -> Result<TaxonomyItemDto> {
        sqlx::query_as::<_, TaxonomyItem>(&format!(
            "SELECT id, name, created_at, updated_at FROM {} WHERE id = $1",
            kind.table()
        ))
        .bind(id)
        .fetch_optional(self.store.pool())
        .await?
        .map(Into::into)
        .ok_or_else(|| AppError::Internal(format!("{} {} is missing", kind.label(), id)))
    }

    fn summaries(&self, rows: Vec<ProductSummaryRow>) -> Vec<ProductSummaryDto> {
        rows.into_iter()
            .map(|row| ProductSummaryDto {
                id: row.id,
                name: row.name,
                category: TaxonomyItemDto {
                    id: row.category_id,
                    name: row.category_name,
                },
                user_id: row.user_id,
                public: row.public,
                status: row.status,
                thumbnail_url: row.thumbnail_path.map(|path| self.files.file_url(&path)),
                created_at: row.created_at,
            })
            .collect()
    }

    fn file_dto(&self, row: ProductFileRow) -> FileDto {
        FileDto {
            id: row.id,
            url: self.files.file_url(&row.file_path),
            file_name: row.file_name,
            stored: row.stored_at.is_some(),
            stored_at: row.stored_at,
        }
    }
}

/// Row-lock a product inside the transaction
async fn lock_product(tx: &mut PgCatalogTx, id: i64) -> Result<Product> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(tx.conn())
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))
}

/// Removed paths no remaining file row points at, without duplicates
fn unshared_paths(removed: Vec<String>, shared: &[String]) -> Vec<String> {
    let mut paths: Vec<String> = removed
        .into_iter()
        .filter(|path| !shared.contains(path))
        .collect();
    paths.sort();
    paths.dedup();
    paths
}

/// Visible in the public catalog
fn is_listed(product: &Product) -> bool {
    product.public && product.status == ProductStatus::Approved
}

fn can_manage(caller: &AuthenticatedUser, product: &Product) -> bool {
    caller.sub == product.user_id || caller.is_admin()
}

/// Hidden products read as missing to everyone but their owner and admins
fn check_visible(product: &Product, caller: Option<&AuthenticatedUser>) -> Result<()> {
    if is_listed(product) || caller.is_some_and(|c| can_manage(c, product)) {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Product {} not found", product.id)))
    }
}
