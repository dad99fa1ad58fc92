pub mod association_manager;
pub mod creation_workflow;
pub mod product_service;

pub use creation_workflow::{CreateProductInput, ProductCreationWorkflow};
pub use product_service::ProductService;
