use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Metadata row for a model or image; bytes are written later by the upload worker
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct File {
    pub id: i64,
    pub file_name: String,
    pub file_path: String,
    pub uploaded_by: String,
    /// `FileCategory` name, see `FileCategory::parse`
    pub category: String,
    /// Staged upload the bytes are copied from
    pub source: String,
    pub stored_at: Option<DateTime<Utc>>,
    pub upload_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns for `File`, in declaration order
pub const FILE_COLUMNS: &str = "id, file_name, file_path, uploaded_by, category, source, \
                                stored_at, upload_error, created_at, updated_at";

/// Values for a new `files` row
#[derive(Debug, Clone, PartialEq)]
pub struct NewFile {
    pub file_name: String,
    pub file_path: String,
    pub uploaded_by: String,
    pub category: FileCategory,
    pub source: String,
}

/// Kind of asset a file holds; selects the storage subpath
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Models,
    Images,
}

impl FileCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Models => "models",
            FileCategory::Images => "images",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "models" => Some(FileCategory::Models),
            "images" => Some(FileCategory::Images),
            _ => None,
        }
    }

    /// Storage path of a file named `file_name` under `base`
    pub fn storage_path(self, base: &str, file_name: &str) -> String {
        format!(
            "{}/{}/{}",
            base.trim_end_matches('/'),
            self.as_str(),
            file_name
        )
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
