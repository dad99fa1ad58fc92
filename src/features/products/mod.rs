//! Products: listing, detail, the transactional creation workflow, owner edits and the
//! review workflow.
//!
//! | Method | Path                                | Access          |
//! |--------|-------------------------------------|-----------------|
//! | GET    | `/api/products`                     | public          |
//! | GET    | `/api/products/user/list`           | caller          |
//! | GET    | `/api/products/{id}`                | public / owner  |
//! | POST   | `/api/products`                     | caller          |
//! | PUT    | `/api/products/{id}`                | owner           |
//! | DELETE | `/api/products/{id}`                | owner           |
//! | POST   | `/api/products/{id}/change-status`  | owner / admin   |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::{ProductCreationWorkflow, ProductService};
