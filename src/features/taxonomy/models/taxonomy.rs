use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// The named lookup tables products are classified by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyKind {
    Tags,
    Categories,
    Platforms,
    Renders,
    Materials,
    Colors,
}

impl TaxonomyKind {
    pub const ALL: [TaxonomyKind; 6] = [
        TaxonomyKind::Tags,
        TaxonomyKind::Categories,
        TaxonomyKind::Platforms,
        TaxonomyKind::Renders,
        TaxonomyKind::Materials,
        TaxonomyKind::Colors,
    ];

    /// Table name; also the URL segment under `/api`
    pub fn table(self) -> &'static str {
        match self {
            TaxonomyKind::Tags => "tags",
            TaxonomyKind::Categories => "categories",
            TaxonomyKind::Platforms => "platforms",
            TaxonomyKind::Renders => "renders",
            TaxonomyKind::Materials => "materials",
            TaxonomyKind::Colors => "colors",
        }
    }

    /// Singular label used in messages
    pub fn label(self) -> &'static str {
        match self {
            TaxonomyKind::Tags => "Tag",
            TaxonomyKind::Categories => "Category",
            TaxonomyKind::Platforms => "Platform",
            TaxonomyKind::Renders => "Render",
            TaxonomyKind::Materials => "Material",
            TaxonomyKind::Colors => "Color",
        }
    }
}

impl std::fmt::Display for TaxonomyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Database model shared by every taxonomy table
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TaxonomyItem {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
