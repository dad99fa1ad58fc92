#[cfg(test)]
use crate::features::auth::model::AuthenticatedUser;
#[cfg(test)]
use crate::modules::storage::StagingUrls;
#[cfg(test)]
use crate::shared::constants::ROLE_ADMIN;

#[cfg(test)]
use axum::{extract::Request, middleware::Next, response::Response, Router};

#[cfg(test)]
pub fn create_admin_user() -> AuthenticatedUser {
    AuthenticatedUser {
        sub: "test-admin".to_string(),
        email: Some("admin@example.com".to_string()),
        name: Some("Test Admin".to_string()),
        roles: vec![ROLE_ADMIN.to_string()],
    }
}

#[cfg(test)]
pub fn create_regular_user() -> AuthenticatedUser {
    AuthenticatedUser {
        sub: "test-user".to_string(),
        email: None,
        name: None,
        roles: vec![],
    }
}

#[cfg(test)]
const TEST_STORAGE_ENDPOINT: &str = "http://localhost:9000";

/// Staging resolver for the local test bucket
#[cfg(test)]
pub fn staging_urls() -> StagingUrls {
    StagingUrls::new([TEST_STORAGE_ENDPOINT], "asset-catalog", "staging")
}

/// URL of a staged upload at `path` below the staging prefix
#[cfg(test)]
pub fn staged_url(path: &str) -> String {
    format!("{}/asset-catalog/staging/{}", TEST_STORAGE_ENDPOINT, path)
}

#[cfg(test)]
async fn inject_admin_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_admin_user());
    next.run(request).await
}

#[cfg(test)]
async fn inject_user_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_regular_user());
    next.run(request).await
}

#[cfg(test)]
pub fn with_admin_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_admin_middleware))
}

#[cfg(test)]
pub fn with_user_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_user_middleware))
}
