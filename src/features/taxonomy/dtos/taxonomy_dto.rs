use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::taxonomy::models::TaxonomyItem;
use crate::shared::validation::validate_taxonomy_name;

/// Response DTO for a taxonomy entry (tag, category, platform, render, material, color)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaxonomyItemDto {
    pub id: i64,
    pub name: String,
}

impl From<TaxonomyItem> for TaxonomyItemDto {
    fn from(item: TaxonomyItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
        }
    }
}

/// Request DTO for creating or renaming a taxonomy entry
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpsertTaxonomyItemDto {
    #[validate(custom(function = "validate_taxonomy_name"))]
    pub name: String,
}

/// Optional case-insensitive name filter for list endpoints
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    pub search: Option<String>,
}

impl SearchQuery {
    /// ILIKE pattern for the search term, `None` when blank
    pub fn pattern(&self) -> Option<String> {
        like_pattern(self.search.as_deref())
    }
}

/// Substring ILIKE pattern with wildcards in the term escaped
pub fn like_pattern(term: Option<&str>) -> Option<String> {
    term.map(str::trim).filter(|s| !s.is_empty()).map(|s| {
        format!(
            "%{}%",
            s.replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_")
        )
    })
}
