//! In-memory catalog for tests
//!
//! A transaction works on a copy of the state and publishes it on commit, so a
//! rolled back or dropped transaction leaves nothing behind. Foreign keys are
//! checked the way Postgres would, and failures can be injected.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{CatalogStore, CatalogTx};
use crate::core::error::{AppError, Result};
use crate::features::files::models::{File, NewFile};
use crate::features::products::models::{
    AssociationKind, NewProduct, NewProductFile, Product, ProductFile, ProductWithRelations,
};
use crate::features::taxonomy::{TaxonomyItem, TaxonomyKind};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub taxonomy: HashMap<TaxonomyKind, BTreeMap<i64, String>>,
    pub users: HashSet<String>,
    pub products: BTreeMap<i64, Product>,
    pub files: BTreeMap<i64, File>,
    pub product_files: Vec<ProductFile>,
    pub links: BTreeSet<(AssociationKind, i64, i64)>,
    /// Junction rows actually inserted by `attach`
    pub attach_inserts: usize,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn has(&self, kind: TaxonomyKind, id: i64) -> bool {
        self.taxonomy
            .get(&kind)
            .is_some_and(|rows| rows.contains_key(&id))
    }

    fn items(&self, kind: AssociationKind, product_id: i64) -> Vec<TaxonomyItem> {
        let now = Utc::now();
        let mut items: Vec<TaxonomyItem> = self
            .links
            .iter()
            .filter(|(k, p, _)| *k == kind && *p == product_id)
            .filter_map(|(_, _, target)| {
                let name = self.taxonomy.get(&kind.target())?.get(target)?;
                Some(TaxonomyItem {
                    id: *target,
                    name: name.clone(),
                    created_at: now,
                    updated_at: now,
                })
            })
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    pub fn links_of(&self, kind: AssociationKind, product_id: i64) -> Vec<i64> {
        self.links
            .iter()
            .filter(|(k, p, _)| *k == kind && *p == product_id)
            .map(|(_, _, target)| *target)
            .collect()
    }
}

/// Test double for `CatalogStore`
#[derive(Clone, Default)]
pub struct MemoryCatalogStore {
    state: Arc<Mutex<MemoryState>>,
    /// Fail the nth file insert (1-based) of every transaction
    fail_file_insert_at: Option<usize>,
    fail_rollback: bool,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_file_insert(mut self, nth: usize) -> Self {
        self.fail_file_insert_at = Some(nth);
        self
    }

    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    pub fn with_user(self, id: &str) -> Self {
        self.lock().users.insert(id.to_string());
        self
    }

    pub fn with_taxonomy(self, kind: TaxonomyKind, id: i64, name: &str) -> Self {
        self.lock()
            .taxonomy
            .entry(kind)
            .or_default()
            .insert(id, name.to_string());
        self
    }

    /// Committed state
    pub fn snapshot(&self) -> MemoryState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    type Tx = MemoryCatalogTx;

    async fn begin(&self) -> Result<MemoryCatalogTx> {
        Ok(MemoryCatalogTx {
            work: self.lock().clone(),
            store: self.clone(),
            file_inserts: 0,
        })
    }

    async fn load_with_relations(&self, product_id: i64) -> Result<ProductWithRelations> {
        let state = self.lock();
        let product = state
            .products
            .get(&product_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;

        Ok(ProductWithRelations {
            product,
            colors: state.items(AssociationKind::Colors, product_id),
            materials: state.items(AssociationKind::Materials, product_id),
            tags: state.items(AssociationKind::Tags, product_id),
        })
    }
}

pub struct MemoryCatalogTx {
    store: MemoryCatalogStore,
    work: MemoryState,
    file_inserts: usize,
}

fn missing(what: &str) -> AppError {
    AppError::Validation(format!("{} references a record that does not exist", what))
}

#[async_trait]
impl CatalogTx for MemoryCatalogTx {
    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product> {
        let state = &mut self.work;
        let platform_ok = product
            .platform_id
            .is_none_or(|id| state.has(TaxonomyKind::Platforms, id));
        let render_ok = product
            .render_id
            .is_none_or(|id| state.has(TaxonomyKind::Renders, id));
        if !state.has(TaxonomyKind::Categories, product.category_id)
            || !platform_ok
            || !render_ok
            || !state.users.contains(&product.user_id)
        {
            return Err(missing("Product"));
        }

        let now = Utc::now();
        let row = Product {
            id: state.next_id(),
            name: product.name.clone(),
            category_id: product.category_id,
            platform_id: product.platform_id,
            render_id: product.render_id,
            user_id: product.user_id.clone(),
            public: product.public,
            status: product.status,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(row.id, row.clone());
        Ok(row)
    }

    async fn associated_ids(&mut self, kind: AssociationKind, product_id: i64) -> Result<Vec<i64>> {
        Ok(self.work.links_of(kind, product_id))
    }

    async fn attach(
        &mut self,
        kind: AssociationKind,
        product_id: i64,
        target_id: i64,
    ) -> Result<bool> {
        if !self.work.products.contains_key(&product_id) || !self.work.has(kind.target(), target_id)
        {
            return Err(missing(kind.target().label()));
        }
        let inserted = self.work.links.insert((kind, product_id, target_id));
        if inserted {
            self.work.attach_inserts += 1;
        }
        Ok(inserted)
    }

    async fn detach(
        &mut self,
        kind: AssociationKind,
        product_id: i64,
        target_id: i64,
    ) -> Result<bool> {
        Ok(self.work.links.remove(&(kind, product_id, target_id)))
    }

    async fn insert_file(&mut self, file: &NewFile) -> Result<File> {
        self.file_inserts += 1;
        if self.store.fail_file_insert_at == Some(self.file_inserts) {
            return Err(AppError::Internal(format!(
                "injected failure inserting file {}",
                file.file_name
            )));
        }
        if !self.work.users.contains(&file.uploaded_by) {
            return Err(missing("File"));
        }

        let now = Utc::now();
        let row = File {
            id: self.work.next_id(),
            file_name: file.file_name.clone(),
            file_path: file.file_path.clone(),
            uploaded_by: file.uploaded_by.clone(),
            category: file.category.as_str().to_string(),
            source: file.source.clone(),
            stored_at: None,
            upload_error: None,
            created_at: now,
            updated_at: now,
        };
        self.work.files.insert(row.id, row.clone());
        Ok(row)
    }

    async fn insert_product_file(&mut self, link: &NewProductFile) -> Result<ProductFile> {
        if !self.work.products.contains_key(&link.product_id)
            || !self.work.files.contains_key(&link.file_id)
        {
            return Err(missing("Product file"));
        }
        let second_model = link.is_model == Some(true)
            && self
                .work
                .product_files
                .iter()
                .any(|pf| pf.product_id == link.product_id && pf.is_model == Some(true));
        if second_model {
            return Err(AppError::Conflict("Product file already exists".to_string()));
        }

        let row = ProductFile {
            id: self.work.next_id(),
            product_id: link.product_id,
            file_id: link.file_id,
            is_model: link.is_model,
            is_thumbnail: link.is_thumbnail,
            created_at: Utc::now(),
        };
        self.work.product_files.push(row.clone());
        Ok(row)
    }

    async fn commit(self) -> Result<()> {
        *self.store.lock() = self.work;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        if self.store.fail_rollback {
            return Err(AppError::Internal("injected rollback failure".to_string()));
        }
        Ok(())
    }
}
