//! Local user rows for token subjects.
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/user` | Upsert and return the caller with token roles |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::UserService;
