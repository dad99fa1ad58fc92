use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Multipart form for temporary uploads (Swagger documentation only)
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct TempUploadDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// A staged upload; pass `url` as `file_url` or in `image_urls` when creating a product
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TempUploadResponseDto {
    pub url: String,
    pub file_name: String,
    pub size: usize,
}

/// A product file as returned in product details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileDto {
    pub id: i64,
    pub file_name: String,
    /// Public URL of the stored object
    pub url: String,
    /// False until the upload worker has stored the bytes
    pub stored: bool,
    pub stored_at: Option<DateTime<Utc>>,
}

/// Allowed MIME types for image uploads
pub const ALLOWED_IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Accepted extensions for 3D model uploads
pub const ALLOWED_MODEL_EXTENSIONS: &[&str] =
    &["glb", "gltf", "fbx", "obj", "stl", "blend", "3ds", "max", "zip"];

pub fn is_image_type_allowed(content_type: &str) -> bool {
    ALLOWED_IMAGE_MIME_TYPES.contains(&content_type)
}

pub fn is_model_extension_allowed(file_name: &str) -> bool {
    extension(file_name).is_some_and(|ext| ALLOWED_MODEL_EXTENSIONS.contains(&ext.as_str()))
}

/// Content type stored with an object, derived from its extension
pub fn content_type_for(file_name: &str) -> &'static str {
    match extension(file_name).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("glb") => "model/gltf-binary",
        Some("gltf") => "model/gltf+json",
        Some("obj") => "model/obj",
        Some("stl") => "model/stl",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for_known_extensions() {
        assert_eq!(content_type_for("chair.GLB"), "model/gltf-binary");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn test_model_extension_whitelist() {
        assert!(is_model_extension_allowed("chair.glb"));
        assert!(is_model_extension_allowed("scene.Blend"));
        assert!(!is_model_extension_allowed("chair.exe"));
        assert!(!is_model_extension_allowed(".glb"));
        assert!(!is_model_extension_allowed("glb"));
    }

    #[test]
    fn test_image_types() {
        assert!(is_image_type_allowed("image/png"));
        assert!(!is_image_type_allowed("application/pdf"));
    }
}
