//! Transactional access to the product catalog tables
//!
//! The creation workflow and the association manager only see these traits, so
//! the same code runs against Postgres in production and an in-memory store in tests.

use async_trait::async_trait;

use crate::core::error::Result;
use crate::features::files::models::{File, NewFile};
use crate::features::products::models::{
    AssociationKind, NewProduct, NewProductFile, Product, ProductFile, ProductWithRelations,
};

#[cfg(test)]
pub mod memory;
mod postgres;

pub use postgres::{PgCatalogStore, PgCatalogTx};

/// Entry point to the catalog: opens transactions and reads products back
#[async_trait]
pub trait CatalogStore: Send + Sync {
    type Tx: CatalogTx;

    async fn begin(&self) -> Result<Self::Tx>;

    /// Product with its colors, materials and tags, read outside any transaction
    async fn load_with_relations(&self, product_id: i64) -> Result<ProductWithRelations>;
}

/// An open transaction; consumed by `commit` or `rollback`
#[async_trait]
pub trait CatalogTx: Send {
    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product>;

    /// Target ids currently linked to the product
    async fn associated_ids(&mut self, kind: AssociationKind, product_id: i64) -> Result<Vec<i64>>;

    /// Link a target; returns false when the pair already existed
    async fn attach(&mut self, kind: AssociationKind, product_id: i64, target_id: i64)
        -> Result<bool>;

    /// Unlink a target; returns false when the pair did not exist
    async fn detach(&mut self, kind: AssociationKind, product_id: i64, target_id: i64)
        -> Result<bool>;

    async fn insert_file(&mut self, file: &NewFile) -> Result<File>;

    async fn insert_product_file(&mut self, link: &NewProductFile) -> Result<ProductFile>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}
