//! MinIO/S3-compatible storage client
//!
//! The bucket is split into two areas: the catalog prefix holds stored product
//! files and is publicly readable, the staging prefix holds temporary uploads
//! that clients reference when creating a product.

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::core::config::MinIOConfig;
use crate::core::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Area of the bucket an object lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    /// Stored product files, readable without credentials
    Catalog,
    /// Temporary uploads awaiting ingestion
    Staging,
}

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    public_endpoint: String,
    catalog_prefix: String,
    staging_prefix: String,
    access_key: String,
    secret_key: String,
    region_name: String,
    http_client: Client,
}

impl MinIOClient {
    /// Connect to the bucket, creating it if needed and opening the catalog prefix for reads
    pub async fn new(config: MinIOConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Failed to create MinIO bucket: {}", e)))?;

        // MinIO expects http://endpoint/bucket rather than virtual-host style
        bucket.set_path_style();

        let http_client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let client = Self {
            bucket,
            region,
            credentials,
            endpoint: trim_endpoint(&config.endpoint),
            public_endpoint: trim_endpoint(&config.public_endpoint),
            catalog_prefix: config.catalog_prefix,
            staging_prefix: config.staging_prefix,
            access_key: config.access_key,
            secret_key: config.secret_key,
            region_name: config.region,
            http_client,
        };

        client.ensure_bucket_exists().await;
        client.set_public_read_policy().await;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}, catalog_prefix: {}, staging_prefix: {}",
            client.endpoint,
            client.bucket.name(),
            client.catalog_prefix,
            client.staging_prefix
        );

        Ok(client)
    }

    /// Create the bucket; an existing bucket is not an error
    async fn ensure_bucket_exists(&self) {
        let result = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match result {
            Ok(_) => info!("Bucket '{}' created successfully", self.bucket.name()),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
    }

    /// Allow anonymous `GetObject` on the catalog prefix
    ///
    /// Failure only logs a warning; the policy can be applied by hand with `mc anonymous`.
    async fn set_public_read_policy(&self) {
        let bucket_name = self.bucket.name();
        let catalog_prefix = &self.catalog_prefix;

        let policy = json!({
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Effect": "Allow",
                    "Principal": {"AWS": "*"},
                    "Action": ["s3:GetObject"],
                    "Resource": [format!("arn:aws:s3:::{bucket_name}/{catalog_prefix}/*")]
                }
            ]
        });

        match self
            .put_bucket_policy_with_sigv4(&bucket_name, &policy.to_string())
            .await
        {
            Ok(()) => info!(
                "Set public read policy for {}/{}/*",
                bucket_name, catalog_prefix
            ),
            Err(e) => warn!(
                "Failed to set bucket policy for '{}': {}. \
                 Set it manually with: mc anonymous set download minio/{}/{}",
                bucket_name, e, bucket_name, catalog_prefix
            ),
        }
    }

    /// PUT ?policy signed with AWS Signature v4 (rust-s3 has no policy call)
    async fn put_bucket_policy_with_sigv4(
        &self,
        bucket_name: &str,
        policy: &str,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let endpoint_url = Url::parse(&self.endpoint)
            .map_err(|e| AppError::Internal(format!("Invalid endpoint URL: {}", e)))?;
        let host = endpoint_url
            .host_str()
            .ok_or_else(|| AppError::Internal("Endpoint URL has no host".to_string()))?;
        let host_header = match endpoint_url.port() {
            Some(p) => format!("{}:{}", host, p),
            None => host.to_string(),
        };

        let url = format!("{}/{}?policy", self.endpoint, bucket_name);
        let payload_hash = hex::encode(Sha256::digest(policy.as_bytes()));

        let canonical_headers = format!(
            "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            host_header, payload_hash, amz_date
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";
        let canonical_request = format!(
            "PUT\n/{}\npolicy=\n{}\n{}\n{}",
            bucket_name, canonical_headers, signed_headers, payload_hash
        );

        let algorithm = "AWS4-HMAC-SHA256";
        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region_name);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            algorithm,
            amz_date,
            credential_scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signature = sigv4_signature(
            &self.secret_key,
            &date_stamp,
            &self.region_name,
            &string_to_sign,
        )?;

        let authorization_header = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            algorithm, self.access_key, credential_scope, signed_headers, signature
        );

        let response = self
            .http_client
            .put(&url)
            .header("Host", &host_header)
            .header("x-amz-date", &amz_date)
            .header("x-amz-content-sha256", &payload_hash)
            .header("Authorization", &authorization_header)
            .header("Content-Type", "application/json")
            .body(policy.to_string())
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send policy request: {}", e)))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(AppError::Internal(format!(
            "Failed to set bucket policy: {} - {}",
            status, body
        )))
    }

    pub fn prefix(&self, area: StorageArea) -> &str {
        match area {
            StorageArea::Catalog => &self.catalog_prefix,
            StorageArea::Staging => &self.staging_prefix,
        }
    }

    /// Object key for `path` inside `area`, e.g. `catalog/products/models/chair.glb`
    pub fn key(&self, area: StorageArea, path: &str) -> String {
        format!("{}/{}", self.prefix(area), path.trim_start_matches('/'))
    }

    pub async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        self.bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to upload file '{}': {}", key, e)))?;

        debug!("Uploaded file '{}' to bucket '{}'", key, self.bucket.name());
        Ok(key.to_string())
    }

    pub async fn download(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let response =
            self.bucket.get_object(key).await.map_err(|e| {
                AppError::Internal(format!("Failed to download file '{}': {}", key, e))
            })?;

        if response.status_code() != 200 {
            return Err(AppError::NotFound(format!(
                "Object '{}' returned status {}",
                key,
                response.status_code()
            )));
        }

        debug!(
            "Downloaded file '{}' from bucket '{}'",
            key,
            self.bucket.name()
        );
        Ok(response.to_vec())
    }

    /// Size in bytes recorded for `key`, when the store reports one
    pub async fn object_size(&self, key: &str) -> Result<Option<u64>, AppError> {
        let (head, _) = self.bucket.head_object(key).await.map_err(|e| {
            let error_str = e.to_string();
            if error_str.contains("404") || error_str.contains("NoSuchKey") {
                AppError::NotFound(format!("Object '{}' does not exist", key))
            } else {
                AppError::Internal(format!("Failed to inspect file '{}': {}", key, e))
            }
        })?;

        Ok(head.content_length.map(|len| len.max(0) as u64))
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.bucket
            .delete_object(key)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to delete file '{}': {}", key, e)))?;

        debug!("Deleted file '{}' from bucket '{}'", key, self.bucket.name());
        Ok(())
    }

    /// URL clients use to read an object; catalog objects go through the public endpoint
    pub fn object_url(&self, key: &str) -> String {
        let base = if key.starts_with(&format!("{}/", self.catalog_prefix)) {
            &self.public_endpoint
        } else {
            &self.endpoint
        };
        let encoded: Vec<_> = key.split('/').map(urlencoding::encode).collect();
        format!("{}/{}/{}", base, self.bucket.name(), encoded.join("/"))
    }

    /// Resolver for URLs that point into the staging area, through either endpoint
    pub fn staging_urls(&self) -> StagingUrls {
        StagingUrls::new(
            [self.public_endpoint.as_str(), self.endpoint.as_str()],
            self.bucket.name(),
            &self.staging_prefix,
        )
    }
}

/// Maps URLs returned by the temp-upload endpoints back to staging object keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingUrls {
    endpoints: Vec<String>,
    bucket: String,
    prefix: String,
}

impl StagingUrls {
    pub fn new<'a>(
        endpoints: impl IntoIterator<Item = &'a str>,
        bucket: impl Into<String>,
        prefix: &str,
    ) -> Self {
        Self {
            endpoints: endpoints.into_iter().map(trim_endpoint).collect(),
            bucket: bucket.into(),
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    /// Staging object key of `url`; `None` for anything outside the staging area
    pub fn key_of(&self, url: &str) -> Option<String> {
        let key = self
            .endpoints
            .iter()
            .find_map(|endpoint| key_under(url, endpoint, &self.bucket))?;

        let rest = key.strip_prefix(&self.prefix)?.strip_prefix('/')?;
        let traverses = rest
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
        (!traverses).then_some(key)
    }
}

fn trim_endpoint(endpoint: &str) -> String {
    endpoint.trim_end_matches('/').to_string()
}

/// Strip `{endpoint}/{bucket}/` from `url`, dropping any query string
fn key_under(url: &str, endpoint: &str, bucket: &str) -> Option<String> {
    let rest = url.strip_prefix(&format!("{}/{}/", endpoint, bucket))?;
    let key = rest.split(['?', '#']).next().unwrap_or_default();
    let key = urlencoding::decode(key).ok()?.into_owned();
    (!key.is_empty()).then_some(key)
}

fn sigv4_signature(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    string_to_sign: &str,
) -> Result<String, AppError> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    )?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, b"s3")?;
    let k_signing = hmac_sha256(&k_service, b"aws4_request")?;

    Ok(hex::encode(hmac_sha256(
        &k_signing,
        string_to_sign.as_bytes(),
    )?))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
