use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::{CatalogStore, CatalogTx};
use crate::core::error::{AppError, Result};
use crate::features::files::models::{File, NewFile, FILE_COLUMNS};
use crate::features::products::models::{
    AssociationKind, NewProduct, NewProductFile, Product, ProductFile, ProductWithRelations,
    PRODUCT_COLUMNS,
};
use crate::features::taxonomy::TaxonomyItem;

/// Postgres-backed catalog
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Linked taxonomy rows of one kind, ordered by name
    pub async fn associated(
        &self,
        kind: AssociationKind,
        product_id: i64,
    ) -> Result<Vec<TaxonomyItem>> {
        let items = sqlx::query_as::<_, TaxonomyItem>(&format!(
            "SELECT t.id, t.name, t.created_at, t.updated_at \
             FROM {table} t \
             JOIN {junction} j ON j.{column} = t.id \
             WHERE j.product_id = $1 \
             ORDER BY t.name",
            table = kind.target().table(),
            junction = kind.junction_table(),
            column = kind.target_column(),
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    type Tx = PgCatalogTx;

    async fn begin(&self) -> Result<PgCatalogTx> {
        let tx = self.pool.begin().await?;
        Ok(PgCatalogTx { tx })
    }

    async fn load_with_relations(&self, product_id: i64) -> Result<ProductWithRelations> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;

        Ok(ProductWithRelations {
            product,
            colors: self.associated(AssociationKind::Colors, product_id).await?,
            materials: self.associated(AssociationKind::Materials, product_id).await?,
            tags: self.associated(AssociationKind::Tags, product_id).await?,
        })
    }
}

/// A Postgres transaction owned by one workflow invocation
pub struct PgCatalogTx {
    tx: Transaction<'static, Postgres>,
}

impl PgCatalogTx {
    /// Connection inside the transaction, for queries outside the trait
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }
}

#[async_trait]
impl CatalogTx for PgCatalogTx {
    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (name, category_id, platform_id, render_id, user_id, public, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(product.category_id)
        .bind(product.platform_id)
        .bind(product.render_id)
        .bind(&product.user_id)
        .bind(product.public)
        .bind(product.status)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_write(e, "Product"))
    }

    async fn associated_ids(&mut self, kind: AssociationKind, product_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT {column} FROM {junction} WHERE product_id = $1 ORDER BY {column}",
            column = kind.target_column(),
            junction = kind.junction_table(),
        ))
        .bind(product_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids)
    }

    async fn attach(
        &mut self,
        kind: AssociationKind,
        product_id: i64,
        target_id: i64,
    ) -> Result<bool> {
        let result = sqlx::query(&format!(
            "INSERT INTO {junction} (product_id, {column}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            junction = kind.junction_table(),
            column = kind.target_column(),
        ))
        .bind(product_id)
        .bind(target_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_write(e, kind.target().label()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn detach(
        &mut self,
        kind: AssociationKind,
        product_id: i64,
        target_id: i64,
    ) -> Result<bool> {
        let result = sqlx::query(&format!(
            "DELETE FROM {junction} WHERE product_id = $1 AND {column} = $2",
            junction = kind.junction_table(),
            column = kind.target_column(),
        ))
        .bind(product_id)
        .bind(target_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_file(&mut self, file: &NewFile) -> Result<File> {
        sqlx::query_as::<_, File>(&format!(
            "INSERT INTO files (file_name, file_path, uploaded_by, category, source) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {FILE_COLUMNS}"
        ))
        .bind(&file.file_name)
        .bind(&file.file_path)
        .bind(&file.uploaded_by)
        .bind(file.category.as_str())
        .bind(&file.source)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_write(e, "File"))
    }

    async fn insert_product_file(&mut self, link: &NewProductFile) -> Result<ProductFile> {
        sqlx::query_as::<_, ProductFile>(
            "INSERT INTO product_files (product_id, file_id, is_model, is_thumbnail) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, product_id, file_id, is_model, is_thumbnail, created_at",
        )
        .bind(link.product_id)
        .bind(link.file_id)
        .bind(link.is_model)
        .bind(link.is_thumbnail)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_write(e, "Product file"))
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
