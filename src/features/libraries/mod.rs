//! Libraries: named, caller-owned collections of products.
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/libraries` | Create |
//! | GET | `/api/libraries` | List the caller's libraries |
//! | GET | `/api/libraries/{id}` | Get one |
//! | PUT, PATCH | `/api/libraries/{id}` | Partial update |
//! | DELETE | `/api/libraries/{id}` | Delete |
//! | POST | `/api/libraries/{id}` | Add a product (idempotent) |
//! | DELETE | `/api/libraries/{id}/products/{product_id}` | Remove a product |
//! | GET | `/api/libraries/{id}/product` | Products in the library |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::LibraryService;
