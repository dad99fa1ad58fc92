//! Object storage for product files and temporary uploads

mod minio_client;

pub use minio_client::{MinIOClient, StagingUrls, StorageArea};
