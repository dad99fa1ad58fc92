use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{File, FILE_COLUMNS};
use crate::features::files::workers::upload_worker::{check_size, FileLedger, ObjectTransfer};
use crate::modules::storage::{MinIOClient, StagingUrls, StorageArea};

/// `files` table access for the upload worker
pub struct PgFileLedger {
    pool: PgPool,
}

impl PgFileLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileLedger for PgFileLedger {
    async fn find(&self, file_id: i64) -> Result<Option<File>> {
        let file = sqlx::query_as::<_, File>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = $1"
        ))
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    async fn pending(&self, older_than: Duration) -> Result<Vec<File>> {
        let files = sqlx::query_as::<_, File>(&format!(
            "SELECT {FILE_COLUMNS} FROM files \
             WHERE stored_at IS NULL AND upload_error IS NULL \
               AND created_at < NOW() - make_interval(secs => $1) \
             ORDER BY id"
        ))
        .bind(older_than.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    async fn mark_stored(&self, file_id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE files SET stored_at = NOW(), upload_error = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(file_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_failed(&self, file_id: i64, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE files SET upload_error = $2, updated_at = NOW() \
             WHERE id = $1 AND stored_at IS NULL",
        )
        .bind(file_id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Copies staged uploads into the catalog area of the bucket
///
/// Only URLs inside the staging area are accepted; nothing is fetched from
/// outside the bucket.
pub struct MinioTransfer {
    minio: Arc<MinIOClient>,
    staging: StagingUrls,
}

impl MinioTransfer {
    pub fn new(minio: Arc<MinIOClient>) -> Self {
        let staging = minio.staging_urls();
        Self { minio, staging }
    }

    fn staged_key(&self, source: &str) -> Result<String> {
        self.staging.key_of(source).ok_or_else(|| {
            AppError::Validation(format!("{} is not a staged upload", source))
        })
    }
}

#[async_trait]
impl ObjectTransfer for MinioTransfer {
    async fn fetch(&self, source: &str, max_size: usize) -> Result<Vec<u8>> {
        let key = self.staged_key(source)?;

        // Refuse before reading when the store already reports an oversized object
        if let Some(size) = self.minio.object_size(&key).await? {
            check_size(source, size, max_size)?;
        }

        let data = self.minio.download(&key).await?;
        check_size(source, data.len() as u64, max_size)?;
        Ok(data)
    }

    async fn store(&self, file_path: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        let key = self.minio.key(StorageArea::Catalog, file_path);
        self.minio.upload(&key, data, content_type).await?;
        Ok(())
    }

    async fn release(&self, source: &str) {
        let Some(key) = self.staging.key_of(source) else {
            return;
        };
        if let Err(e) = self.minio.delete(&key).await {
            tracing::warn!("Failed to remove staged upload '{}': {:?}", key, e);
        }
    }
}
