pub mod auth;
pub mod files;
pub mod libraries;
pub mod products;
pub mod taxonomy;
pub mod users;
