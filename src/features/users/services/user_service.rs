use sqlx::PgPool;

use crate::core::error::Result;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::users::models::User;

/// Keeps the `users` table in step with token subjects
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the caller's row, or refresh email and name from the token
    ///
    /// Products, files and libraries reference `users(id)`, so this runs before
    /// the caller's first write.
    pub async fn ensure(&self, caller: &AuthenticatedUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, display_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET email = COALESCE(EXCLUDED.email, users.email),
                display_name = COALESCE(EXCLUDED.display_name, users.display_name),
                updated_at = NOW()
            RETURNING id, email, display_name, created_at, updated_at
            "#,
        )
        .bind(&caller.sub)
        .bind(&caller.email)
        .bind(&caller.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert user {}: {:?}", caller.sub, e);
            e
        })?;

        tracing::debug!("User row ensured: id={}", user.id);
        Ok(user)
    }
}
