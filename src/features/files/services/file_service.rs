use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::files::dtos::TempUploadResponseDto;
use crate::features::files::models::FileCategory;
use crate::modules::storage::{MinIOClient, StorageArea};

/// Staged uploads and object URLs for product files
pub struct FileService {
    minio_client: Arc<MinIOClient>,
}

impl FileService {
    pub fn new(minio_client: Arc<MinIOClient>) -> Self {
        Self { minio_client }
    }

    /// Store an upload under the staging area
    ///
    /// The key is `{staging}/{category}/{uuid}/{name}` so the URL's last segment
    /// stays the original file name.
    pub async fn upload_temp(
        &self,
        data: Vec<u8>,
        original_filename: &str,
        content_type: &str,
        category: FileCategory,
        user_id: &str,
    ) -> Result<TempUploadResponseDto> {
        let size = data.len();
        let file_name = sanitize_file_name(original_filename);
        let path = format!("{}/{}/{}", category, Uuid::now_v7(), file_name);
        let key = self.minio_client.key(StorageArea::Staging, &path);

        self.minio_client.upload(&key, data, content_type).await?;
        debug!("Staged upload stored at {}", key);

        info!(
            "Temporary {} upload by {}: key={}, size={}",
            category, user_id, key, size
        );

        Ok(TempUploadResponseDto {
            url: self.minio_client.object_url(&key),
            file_name,
            size,
        })
    }

    /// Public URL of a stored product file
    pub fn file_url(&self, file_path: &str) -> String {
        self.minio_client
            .object_url(&self.minio_client.key(StorageArea::Catalog, file_path))
    }

    /// Remove stored objects; failures are logged and skipped
    pub async fn delete_stored(&self, file_paths: &[String]) {
        for path in file_paths {
            let key = self.minio_client.key(StorageArea::Catalog, path);
            if let Err(e) = self.minio_client.delete(&key).await {
                warn!("Failed to delete stored object '{}': {:?}", key, e);
            }
        }
    }
}

/// Client-supplied file name reduced to its last path component
pub fn sanitize_file_name(raw: &str) -> String {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .trim_start_matches('.');

    if name.is_empty() {
        "unnamed".to_string()
    } else {
        name.to_string()
    }
}
