use crate::core::error::{AppError, Result};
use crate::features::files::models::{File, FileCategory, NewFile};
use crate::features::files::services::upload_queue::{UploadQueue, UploadTask};
use crate::modules::catalog_store::CatalogTx;
use crate::modules::storage::StagingUrls;

/// Registers File rows inside a catalog transaction and defers the byte transfer
///
/// Only the row is transactional. A queued task may run before the transaction
/// commits or for a row that is rolled back; the worker handles both.
/// Sources must be URLs returned by the temp-upload endpoints.
pub struct FileIngestion {
    base_path: String,
    staging: StagingUrls,
    queue: UploadQueue,
}

impl FileIngestion {
    pub fn new(base_path: impl Into<String>, staging: StagingUrls, queue: UploadQueue) -> Self {
        Self {
            base_path: base_path.into(),
            staging,
            queue,
        }
    }

    pub async fn ingest<T: CatalogTx>(
        &self,
        tx: &mut T,
        source: &str,
        category: FileCategory,
        uploaded_by: &str,
    ) -> Result<File> {
        if self.staging.key_of(source).is_none() {
            return Err(AppError::Validation(format!(
                "File reference '{}' is not a staged upload",
                source
            )));
        }

        let file_name = display_name(source)?;
        let file_path = category.storage_path(&self.base_path, &file_name);

        let file = tx
            .insert_file(&NewFile {
                file_name,
                file_path,
                uploaded_by: uploaded_by.to_string(),
                category,
                source: source.to_string(),
            })
            .await?;

        self.queue.submit(UploadTask {
            file_id: file.id,
            source: source.to_string(),
            category,
        })?;

        tracing::debug!(
            "Registered {} file {} at {}",
            category,
            file.id,
            file.file_path
        );
        Ok(file)
    }
}

/// Last path segment of a reference, without query or fragment, percent-decoded
pub fn display_name(source: &str) -> Result<String> {
    let path = source.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();

    let name = urlencoding::decode(segment)
        .map_err(|_| AppError::Validation(format!("File reference '{}' is not valid UTF-8", source)))?
        .trim()
        .to_string();

    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(AppError::Validation(format!(
            "File reference '{}' has no file name",
            source
        )));
    }

    Ok(name)
}
