use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Link between a product and one of its files
///
/// `is_model` and `is_thumbnail` are nullable; rows written here always set `is_model`.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ProductFile {
    pub id: i64,
    pub product_id: i64,
    pub file_id: i64,
    pub is_model: Option<bool>,
    pub is_thumbnail: Option<bool>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewProductFile {
    pub product_id: i64,
    pub file_id: i64,
    pub is_model: Option<bool>,
    pub is_thumbnail: Option<bool>,
}

impl NewProductFile {
    pub fn model(product_id: i64, file_id: i64) -> Self {
        Self {
            product_id,
            file_id,
            is_model: Some(true),
            is_thumbnail: None,
        }
    }

    /// Image link; the first image of a product is its thumbnail
    pub fn image(product_id: i64, file_id: i64, position: usize) -> Self {
        Self {
            product_id,
            file_id,
            is_model: Some(false),
            is_thumbnail: Some(position == 0),
        }
    }
}
