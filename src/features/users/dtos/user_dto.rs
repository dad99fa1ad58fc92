use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::users::models::User;

/// The caller's account as known to the catalog
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Roles from the access token
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl UserDto {
    pub fn new(user: User, roles: Vec<String>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            roles,
            created_at: user.created_at,
        }
    }
}
