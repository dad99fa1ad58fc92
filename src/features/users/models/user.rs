use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Local mirror of an identity provider account, keyed by subject
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
