use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::constants::ROLE_ADMIN;

/// Caller identity resolved from a validated bearer token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Identity provider subject; doubles as the `users.id` primary key
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Admins moderate products and maintain the taxonomy tables
    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}
