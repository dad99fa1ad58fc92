pub mod file_ingestion;
pub mod file_service;
pub mod upload_queue;

pub use file_ingestion::FileIngestion;
pub use file_service::FileService;
pub use upload_queue::{UploadQueue, UploadTask};
