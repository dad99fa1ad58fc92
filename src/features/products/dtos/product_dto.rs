use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::features::files::dtos::FileDto;
use crate::features::products::models::{ProductStatus, ProductWithRelations};
use crate::features::products::services::CreateProductInput;
use crate::features::taxonomy::dtos::{like_pattern, TaxonomyItemDto};
use crate::shared::validation::validate_name;

/// Request DTO for creating a product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductDto {
    #[validate(custom(function = "validate_name"))]
    pub name: String,

    #[validate(range(min = 1, message = "category_id must be positive"))]
    pub category_id: i64,

    pub platform_id: Option<i64>,

    pub render_id: Option<i64>,

    #[serde(default)]
    pub color_ids: Vec<i64>,

    #[serde(default)]
    pub material_ids: Vec<i64>,

    #[serde(default)]
    pub tag_ids: Vec<i64>,

    /// Staged model URL from `/api/upload-temp-model`
    #[validate(length(min = 1, max = 2048, message = "file_url is required"))]
    pub file_url: String,

    /// Staged image URLs; the first becomes the thumbnail
    #[serde(default)]
    #[validate(custom(function = "validate_sources"))]
    pub image_urls: Vec<String>,
}

fn validate_sources(sources: &[String]) -> Result<(), ValidationError> {
    if sources.iter().any(|s| s.trim().is_empty() || s.len() > 2048) {
        return Err(ValidationError::new("image_urls")
            .with_message("image_urls must not contain blank entries".into()));
    }
    Ok(())
}

impl From<CreateProductDto> for CreateProductInput {
    fn from(dto: CreateProductDto) -> Self {
        Self {
            name: dto.name.trim().to_string(),
            category_id: dto.category_id,
            platform_id: dto.platform_id,
            render_id: dto.render_id,
            color_ids: dto.color_ids,
            material_ids: dto.material_ids,
            tag_ids: dto.tag_ids,
            model_source: dto.file_url.trim().to_string(),
            image_sources: dto
                .image_urls
                .into_iter()
                .map(|s| s.trim().to_string())
                .collect(),
        }
    }
}

/// Request DTO for updating a product; absent fields are left unchanged
///
/// A present id list replaces the whole association set.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductDto {
    #[validate(custom(function = "validate_name"))]
    pub name: Option<String>,

    #[validate(range(min = 1, message = "category_id must be positive"))]
    pub category_id: Option<i64>,

    pub platform_id: Option<i64>,

    pub render_id: Option<i64>,

    pub public: Option<bool>,

    pub color_ids: Option<Vec<i64>>,

    pub material_ids: Option<Vec<i64>>,

    pub tag_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangeStatusDto {
    pub status: ProductStatus,
}

/// Filters for the public product list
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductFilterQuery {
    pub category_id: Option<i64>,
    pub platform_id: Option<i64>,
    pub render_id: Option<i64>,
    /// Case-insensitive substring of the product name
    pub search: Option<String>,
}

impl ProductFilterQuery {
    pub fn pattern(&self) -> Option<String> {
        like_pattern(self.search.as_deref())
    }
}

/// A product with its association sets
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductDto {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub platform_id: Option<i64>,
    pub render_id: Option<i64>,
    pub user_id: String,
    pub public: bool,
    pub status: ProductStatus,
    pub colors: Vec<TaxonomyItemDto>,
    pub materials: Vec<TaxonomyItemDto>,
    pub tags: Vec<TaxonomyItemDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductWithRelations> for ProductDto {
    fn from(value: ProductWithRelations) -> Self {
        let product = value.product;
        Self {
            id: product.id,
            name: product.name,
            category_id: product.category_id,
            platform_id: product.platform_id,
            render_id: product.render_id,
            user_id: product.user_id,
            public: product.public,
            status: product.status,
            colors: value.colors.into_iter().map(Into::into).collect(),
            materials: value.materials.into_iter().map(Into::into).collect(),
            tags: value.tags.into_iter().map(Into::into).collect(),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// List entry
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductSummaryDto {
    pub id: i64,
    pub name: String,
    pub category: TaxonomyItemDto,
    pub user_id: String,
    pub public: bool,
    pub status: ProductStatus,
    /// Set once the thumbnail has been stored
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Full product view
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductDetailDto {
    pub id: i64,
    pub name: String,
    pub user_id: String,
    pub public: bool,
    pub status: ProductStatus,
    pub category: TaxonomyItemDto,
    pub platform: Option<TaxonomyItemDto>,
    pub render: Option<TaxonomyItemDto>,
    pub colors: Vec<TaxonomyItemDto>,
    pub materials: Vec<TaxonomyItemDto>,
    pub tags: Vec<TaxonomyItemDto>,
    pub model_files: Vec<FileDto>,
    /// In upload order; the first is the thumbnail
    pub image_files: Vec<FileDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_dto() -> CreateProductDto {
        serde_json::from_value(serde_json::json!({
            "name": " Chair ",
            "category_id": 1,
            "file_url": "https://example.com/chair.glb",
            "image_urls": ["a.png", "b.png"],
            "color_ids": [3, 4]
        }))
        .unwrap()
    }

    #[test]
    fn test_create_dto_defaults_missing_lists() {
        let dto: CreateProductDto = serde_json::from_value(serde_json::json!({
            "name": "Chair",
            "category_id": 1,
            "file_url": "chair.glb"
        }))
        .unwrap();
        assert!(dto.validate().is_ok());
        assert!(dto.image_urls.is_empty());
        assert!(dto.tag_ids.is_empty());
    }

    #[test]
    fn test_create_dto_validation() {
        assert!(valid_dto().validate().is_ok());

        for name in ["", "   "] {
            let mut dto = valid_dto();
            dto.name = name.to_string();
            assert!(dto.validate().is_err(), "{name:?} should be rejected");
        }

        let mut dto = valid_dto();
        dto.file_url = String::new();
        assert!(dto.validate().is_err());

        let mut dto = valid_dto();
        dto.image_urls.push("  ".to_string());
        assert!(dto.validate().is_err());

        let mut dto = valid_dto();
        dto.category_id = 0;
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_create_dto_into_input_trims() {
        let input: CreateProductInput = valid_dto().into();
        assert_eq!(input.name, "Chair");
        assert_eq!(input.model_source, "https://example.com/chair.glb");
        assert_eq!(input.image_sources, vec!["a.png", "b.png"]);
        assert_eq!(input.color_ids, vec![3, 4]);
    }

    #[test]
    fn test_update_dto_rejects_blank_name_only_when_present() {
        assert!(UpdateProductDto::default().validate().is_ok());

        let dto = UpdateProductDto {
            name: Some(" \t ".to_string()),
            ..Default::default()
        };
        assert!(dto.validate().is_err());

        let dto = UpdateProductDto {
            name: Some(" Stool ".to_string()),
            ..Default::default()
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_change_status_parses_enum() {
        let dto: ChangeStatusDto =
            serde_json::from_value(serde_json::json!({ "status": "PENDING_APPROVAL" })).unwrap();
        assert_eq!(dto.status, ProductStatus::PendingApproval);
        assert!(
            serde_json::from_value::<ChangeStatusDto>(serde_json::json!({ "status": "LIVE" }))
                .is_err()
        );
    }
}
