pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use models::{TaxonomyItem, TaxonomyKind};
pub use routes::routes;
pub use services::TaxonomyService;
