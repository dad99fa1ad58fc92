//! Idempotent many-to-many linking between a product and its colors, materials and tags

use std::collections::HashSet;

use crate::core::error::Result;
use crate::features::products::models::AssociationKind;
use crate::modules::catalog_store::CatalogTx;

/// Ids in first-seen order with duplicates removed
fn unique(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Link every id not yet linked; returns how many rows were inserted
///
/// An empty list touches nothing.
pub async fn attach<T: CatalogTx>(
    tx: &mut T,
    kind: AssociationKind,
    product_id: i64,
    ids: &[i64],
) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }

    let mut inserted = 0;
    for id in unique(ids) {
        if tx.attach(kind, product_id, id).await? {
            inserted += 1;
        }
    }

    tracing::debug!(
        "Attached {} {} to product {} ({} requested)",
        inserted,
        kind,
        product_id,
        ids.len()
    );
    Ok(inserted)
}

/// Unlink the given ids; returns how many rows were removed
pub async fn detach<T: CatalogTx>(
    tx: &mut T,
    kind: AssociationKind,
    product_id: i64,
    ids: &[i64],
) -> Result<usize> {
    let mut removed = 0;
    for id in unique(ids) {
        if tx.detach(kind, product_id, id).await? {
            removed += 1;
        }
    }
    Ok(removed)
}

/// Make the linked set equal to `ids`
pub async fn sync<T: CatalogTx>(
    tx: &mut T,
    kind: AssociationKind,
    product_id: i64,
    ids: &[i64],
) -> Result<()> {
    let wanted: HashSet<i64> = ids.iter().copied().collect();
    let current = tx.associated_ids(kind, product_id).await?;

    let stale: Vec<i64> = current
        .iter()
        .copied()
        .filter(|id| !wanted.contains(id))
        .collect();
    detach(tx, kind, product_id, &stale).await?;
    attach(tx, kind, product_id, ids).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppError;
    use crate::features::products::models::{NewProduct, ProductStatus};
    use crate::features::taxonomy::TaxonomyKind;
    use crate::modules::catalog_store::memory::{MemoryCatalogStore, MemoryCatalogTx};
    use crate::modules::catalog_store::CatalogStore;

    fn store() -> MemoryCatalogStore {
        MemoryCatalogStore::new()
            .with_user("u1")
            .with_taxonomy(TaxonomyKind::Categories, 1, "Furniture")
            .with_taxonomy(TaxonomyKind::Colors, 5, "Red")
            .with_taxonomy(TaxonomyKind::Colors, 6, "Blue")
            .with_taxonomy(TaxonomyKind::Colors, 7, "Green")
    }

    async fn product_tx(store: &MemoryCatalogStore) -> (MemoryCatalogTx, i64) {
        let mut tx = store.begin().await.unwrap();
        let product = tx
            .insert_product(&NewProduct {
                name: "Chair".to_string(),
                category_id: 1,
                platform_id: None,
                render_id: None,
                user_id: "u1".to_string(),
                public: true,
                status: ProductStatus::Draft,
            })
            .await
            .unwrap();
        (tx, product.id)
    }

    #[test]
    fn test_unique_keeps_first_seen_order() {
        assert_eq!(unique(&[6, 5, 6, 5, 7]), vec![6, 5, 7]);
    }

    #[tokio::test]
    async fn test_empty_list_is_noop() {
        let store = store();
        let (mut tx, product_id) = product_tx(&store).await;

        let inserted = attach(&mut tx, AssociationKind::Colors, product_id, &[])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(inserted, 0);
        assert_eq!(store.snapshot().attach_inserts, 0);
    }

    #[tokio::test]
    async fn test_duplicate_ids_create_one_row_each() {
        let store = store();
        let (mut tx, product_id) = product_tx(&store).await;

        let inserted = attach(&mut tx, AssociationKind::Colors, product_id, &[5, 5, 6])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let state = store.snapshot();
        assert_eq!(inserted, 2);
        assert_eq!(state.attach_inserts, 2);
        assert_eq!(state.links_of(AssociationKind::Colors, product_id), vec![5, 6]);
    }

    #[tokio::test]
    async fn test_attach_skips_existing_links() {
        let store = store();
        let (mut tx, product_id) = product_tx(&store).await;

        attach(&mut tx, AssociationKind::Colors, product_id, &[5])
            .await
            .unwrap();
        let inserted = attach(&mut tx, AssociationKind::Colors, product_id, &[5, 6])
            .await
            .unwrap();

        assert_eq!(inserted, 1);
    }

    #[tokio::test]
    async fn test_unknown_target_is_validation_error() {
        let store = store();
        let (mut tx, product_id) = product_tx(&store).await;

        let err = attach(&mut tx, AssociationKind::Tags, product_id, &[99])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_sync_replaces_set() {
        let store = store();
        let (mut tx, product_id) = product_tx(&store).await;

        attach(&mut tx, AssociationKind::Colors, product_id, &[5, 6])
            .await
            .unwrap();
        sync(&mut tx, AssociationKind::Colors, product_id, &[6, 7])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            store
                .snapshot()
                .links_of(AssociationKind::Colors, product_id),
            vec![6, 7]
        );
    }

    #[tokio::test]
    async fn test_sync_to_empty_clears_links() {
        let store = store();
        let (mut tx, product_id) = product_tx(&store).await;

        attach(&mut tx, AssociationKind::Colors, product_id, &[5, 6])
            .await
            .unwrap();
        sync(&mut tx, AssociationKind::Colors, product_id, &[])
            .await
            .unwrap();

        assert!(tx
            .associated_ids(AssociationKind::Colors, product_id)
            .await
            .unwrap()
            .is_empty());
    }
}
