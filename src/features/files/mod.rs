pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod workers;

pub use handlers::FilesState;
pub use routes::routes;
pub use services::{FileIngestion, FileService, UploadQueue};
