use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub swagger: SwaggerConfig,
    pub minio: MinIOConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub jwks_url: String,
    pub jwks_cache_ttl: Duration,
    pub jwt_leeway: Duration,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// MinIO/S3 storage configuration for catalog assets
#[derive(Debug, Clone)]
pub struct MinIOConfig {
    /// MinIO/S3 endpoint URL
    pub endpoint: String,
    /// Public endpoint URL for publicly readable assets (defaults to endpoint)
    pub public_endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// AWS region (for S3 compatibility)
    pub region: String,
    /// Prefix of the publicly readable catalog area (e.g., "catalog")
    pub catalog_prefix: String,
    /// Prefix of the temporary upload area (e.g., "staging")
    pub staging_prefix: String,
}

/// File ingestion and upload worker settings
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Base path prepended to every stored file path
    pub file_path: String,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub worker_concurrency: usize,
    /// How often the worker requeues rows still waiting on bytes
    pub sweep_interval: Duration,
    pub max_image_size: usize,
    pub max_model_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                tracing::warn!("Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            minio: MinIOConfig::from_env()?,
            upload: UploadConfig::from_env()?,
        })
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset
fn parse_or<T>(name: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr + ToString,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .map_err(|_| format!("{} must be a valid number", name))
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size = parse_or(
            "MAX_REQUEST_BODY_SIZE",
            Self::DEFAULT_MAX_REQUEST_BODY_SIZE,
        )?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: parse_or("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_or("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_or(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_or("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: parse_or("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }
}

impl AuthConfig {
    const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 3600; // 1 hour
    const DEFAULT_JWT_LEEWAY_SECS: u64 = 60;

    pub fn from_env() -> Result<Self, String> {
        let issuer = env::var("AUTH_ISSUER")
            .map_err(|_| "AUTH_ISSUER environment variable is required".to_string())?;

        let audience = env::var("AUTH_AUDIENCE")
            .map_err(|_| "AUTH_AUDIENCE environment variable is required".to_string())?;

        // Most OIDC providers publish keys next to the issuer
        let jwks_url = env::var("AUTH_JWKS_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{}/jwks", issuer.trim_end_matches('/')));

        let jwks_cache_ttl_secs = parse_or("JWKS_CACHE_TTL", Self::DEFAULT_JWKS_CACHE_TTL_SECS)?;
        let jwt_leeway_secs = parse_or("JWT_LEEWAY", Self::DEFAULT_JWT_LEEWAY_SECS)?;

        Ok(Self {
            issuer,
            audience,
            jwks_url,
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl_secs),
            jwt_leeway: Duration::from_secs(jwt_leeway_secs),
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Asset Catalog API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "API documentation for the asset catalog".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl MinIOConfig {
    pub fn from_env() -> Result<Self, String> {
        let endpoint =
            env::var("MINIO_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());

        let public_endpoint =
            env::var("MINIO_PUBLIC_ENDPOINT").unwrap_or_else(|_| endpoint.clone());

        let access_key = env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string());
        let secret_key = env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string());
        let bucket = env::var("MINIO_BUCKET").unwrap_or_else(|_| "asset-catalog".to_string());
        let region = env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let catalog_prefix =
            env::var("MINIO_CATALOG_PREFIX").unwrap_or_else(|_| "catalog".to_string());
        let staging_prefix =
            env::var("MINIO_STAGING_PREFIX").unwrap_or_else(|_| "staging".to_string());

        if catalog_prefix == staging_prefix {
            return Err("MINIO_CATALOG_PREFIX and MINIO_STAGING_PREFIX must differ".to_string());
        }

        Ok(Self {
            endpoint,
            public_endpoint,
            access_key,
            secret_key,
            bucket,
            region,
            catalog_prefix,
            staging_prefix,
        })
    }
}

impl UploadConfig {
    const DEFAULT_FILE_PATH: &'static str = "products";
    const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    const DEFAULT_BACKOFF_BASE_MS: u64 = 500;
    const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;
    const DEFAULT_WORKER_CONCURRENCY: usize = 4;
    const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
    const DEFAULT_MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024; // 10MB
    const DEFAULT_MAX_MODEL_SIZE: usize = 100 * 1024 * 1024; // 100MB

    pub fn from_env() -> Result<Self, String> {
        let file_path =
            env::var("FILE_PATH").unwrap_or_else(|_| Self::DEFAULT_FILE_PATH.to_string());

        let max_attempts: u32 = parse_or("UPLOAD_MAX_ATTEMPTS", Self::DEFAULT_MAX_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err("UPLOAD_MAX_ATTEMPTS must be at least 1".to_string());
        }

        let worker_concurrency: usize = parse_or(
            "UPLOAD_WORKER_CONCURRENCY",
            Self::DEFAULT_WORKER_CONCURRENCY,
        )?;

        Ok(Self {
            file_path,
            max_attempts,
            backoff_base: Duration::from_millis(parse_or(
                "UPLOAD_BACKOFF_BASE_MS",
                Self::DEFAULT_BACKOFF_BASE_MS,
            )?),
            backoff_max: Duration::from_millis(parse_or(
                "UPLOAD_BACKOFF_MAX_MS",
                Self::DEFAULT_BACKOFF_MAX_MS,
            )?),
            worker_concurrency: worker_concurrency.max(1),
            sweep_interval: Duration::from_secs(
                parse_or(
                    "UPLOAD_SWEEP_INTERVAL_SECS",
                    Self::DEFAULT_SWEEP_INTERVAL_SECS,
                )?
                .max(1),
            ),
            max_image_size: parse_or("MAX_IMAGE_SIZE", Self::DEFAULT_MAX_IMAGE_SIZE)?,
            max_model_size: parse_or("MAX_MODEL_SIZE", Self::DEFAULT_MAX_MODEL_SIZE)?,
        })
    }
}
