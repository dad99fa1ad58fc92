use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A caller-owned collection of products
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Library {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const LIBRARY_COLUMNS: &str = "id, name, description, user_id, created_at, updated_at";
