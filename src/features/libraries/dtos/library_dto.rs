use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::features::libraries::models::Library;
use crate::shared::validation::validate_name;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLibraryDto {
    #[validate(custom(function = "validate_name"))]
    pub name: String,

    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    pub description: Option<String>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateLibraryDto {
    #[validate(custom(function = "validate_name"))]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddProductDto {
    #[validate(range(min = 1, message = "product_id must be positive"))]
    pub product_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LibraryDto {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub user_id: String,
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LibraryDto {
    pub fn new(library: Library, product_count: i64) -> Self {
        Self {
            id: library.id,
            name: library.name,
            description: library.description,
            user_id: library.user_id,
            product_count,
            created_at: library.created_at,
            updated_at: library.updated_at,
        }
    }
}

/// Trimmed value, with blank input mapped to `None`
pub fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_library_validation() {
        let dto: CreateLibraryDto =
            serde_json::from_value(serde_json::json!({ "name": "Favourites" })).unwrap();
        assert!(dto.validate().is_ok());
        assert!(dto.description.is_none());

        for name in ["", "  "] {
            let dto = CreateLibraryDto {
                name: name.to_string(),
                description: None,
            };
            assert!(dto.validate().is_err());
        }
    }

    #[test]
    fn test_update_library_allows_empty_body() {
        let dto: UpdateLibraryDto = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(dto.validate().is_ok());

        let dto = UpdateLibraryDto {
            name: Some("   ".to_string()),
            description: None,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(normalize_description(None), None);
        assert_eq!(normalize_description(Some("   ")), None);
        assert_eq!(
            normalize_description(Some(" Chairs I like ")),
            Some("Chairs I like".to_string())
        );
    }

    #[test]
    fn test_library_dto_carries_count() {
        let now = Utc::now();
        let dto = LibraryDto::new(
            Library {
                id: 3,
                name: "Favourites".to_string(),
                description: None,
                user_id: "u1".to_string(),
                created_at: now,
                updated_at: now,
            },
            7,
        );
        assert_eq!(dto.id, 3);
        assert_eq!(dto.product_count, 7);
    }
}
