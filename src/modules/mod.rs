//! Modules layer - Infrastructure components shared across features
//!
//! Contains the catalog store abstraction and the object storage client.

pub mod catalog_store;
pub mod storage;
