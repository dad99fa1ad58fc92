pub mod upload_adapters;
pub mod upload_worker;

pub use upload_adapters::{MinioTransfer, PgFileLedger};
pub use upload_worker::{
    FileLedger, ObjectTransfer, RetryPolicy, SizeLimits, UploadOutcome, UploadWorker,
};
