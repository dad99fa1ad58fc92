use crate::core::error::{AppError, Result};
use crate::features::files::models::FileCategory;
use crate::features::files::services::FileIngestion;
use crate::features::products::models::{
    AssociationKind, NewProduct, NewProductFile, Product, ProductStatus, ProductWithRelations,
};
use crate::features::products::services::association_manager;
use crate::modules::catalog_store::{CatalogStore, CatalogTx};

/// Validated input for creating a product
#[derive(Debug, Clone, PartialEq)]
pub struct CreateProductInput {
    pub name: String,
    pub category_id: i64,
    pub platform_id: Option<i64>,
    pub render_id: Option<i64>,
    pub color_ids: Vec<i64>,
    pub material_ids: Vec<i64>,
    pub tag_ids: Vec<i64>,
    pub model_source: String,
    pub image_sources: Vec<String>,
}

/// Creates a product, its associations and its file rows in one transaction
///
/// Upload tasks are queued as files are registered and are not recalled on
/// rollback; the upload worker discards tasks whose row never appears.
pub struct ProductCreationWorkflow<S> {
    store: S,
    ingestion: FileIngestion,
}

impl<S: CatalogStore> ProductCreationWorkflow<S> {
    pub fn new(store: S, ingestion: FileIngestion) -> Self {
        Self { store, ingestion }
    }

    /// Returns the committed product with its colors, materials and tags
    pub async fn create(
        &self,
        input: &CreateProductInput,
        owner_id: &str,
    ) -> Result<ProductWithRelations> {
        let mut tx = self.store.begin().await.map_err(creation_failure)?;

        let product = match self.write(&mut tx, input, owner_id).await {
            Ok(product) => product,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        "Rollback after failed product creation also failed: {:?}",
                        rollback_err
                    );
                }
                tracing::warn!(
                    "Product creation for {} rolled back: {}",
                    owner_id,
                    e
                );
                return Err(creation_failure(e));
            }
        };

        tx.commit().await.map_err(creation_failure)?;

        tracing::info!(
            "Product created: id={}, name={}, owner={}, images={}",
            product.id,
            product.name,
            owner_id,
            input.image_sources.len()
        );

        self.store.load_with_relations(product.id).await
    }

    async fn write(
        &self,
        tx: &mut S::Tx,
        input: &CreateProductInput,
        owner_id: &str,
    ) -> Result<Product> {
        let product = tx
            .insert_product(&NewProduct {
                name: input.name.clone(),
                category_id: input.category_id,
                platform_id: input.platform_id,
                render_id: input.render_id,
                user_id: owner_id.to_string(),
                public: true,
                status: ProductStatus::Draft,
            })
            .await?;

        let associations = [
            (AssociationKind::Colors, &input.color_ids),
            (AssociationKind::Materials, &input.material_ids),
            (AssociationKind::Tags, &input.tag_ids),
        ];
        for (kind, ids) in associations {
            association_manager::attach(tx, kind, product.id, ids).await?;
        }

        let model = self
            .ingestion
            .ingest(tx, &input.model_source, FileCategory::Models, owner_id)
            .await?;
        tx.insert_product_file(&NewProductFile::model(product.id, model.id))
            .await?;

        for (position, source) in input.image_sources.iter().enumerate() {
            let image = self
                .ingestion
                .ingest(tx, source, FileCategory::Images, owner_id)
                .await?;
            tx.insert_product_file(&NewProductFile::image(product.id, image.id, position))
                .await?;
        }

        Ok(product)
    }
}

/// Validation failures keep their kind; everything else carries its message as a creation failure
fn creation_failure(err: AppError) -> AppError {
    match err {
        AppError::Validation(_) | AppError::CreationFailed(_) => err,
        other => AppError::CreationFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::services::{UploadQueue, UploadTask};
    use crate::features::taxonomy::TaxonomyKind;
    use crate::modules::catalog_store::memory::{MemoryCatalogStore, MemoryState};
    use crate::shared::test_helpers::{staged_url, staging_urls};
    use fake::faker::lorem::en::Word;
    use fake::Fake;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn seeded_store() -> MemoryCatalogStore {
        MemoryCatalogStore::new()
            .with_user("u1")
            .with_taxonomy(TaxonomyKind::Categories, 1, "Furniture")
            .with_taxonomy(TaxonomyKind::Colors, 3, "Red")
            .with_taxonomy(TaxonomyKind::Colors, 4, "Blue")
            .with_taxonomy(TaxonomyKind::Materials, 8, "Oak")
            .with_taxonomy(TaxonomyKind::Tags, 11, "Indoor")
    }

    fn workflow(
        store: MemoryCatalogStore,
    ) -> (
        ProductCreationWorkflow<MemoryCatalogStore>,
        UnboundedReceiver<UploadTask>,
    ) {
        let (queue, receiver) = UploadQueue::channel();
        (
            ProductCreationWorkflow::new(
                store,
                FileIngestion::new("products", staging_urls(), queue),
            ),
            receiver,
        )
    }

    fn chair_input() -> CreateProductInput {
        CreateProductInput {
            name: "Chair".to_string(),
            category_id: 1,
            platform_id: None,
            render_id: None,
            color_ids: vec![3, 4],
            material_ids: vec![],
            tag_ids: vec![],
            model_source: staged_url("models/0190/chair.glb"),
            image_sources: vec![
                staged_url("images/0191/a.png"),
                staged_url("images/0192/b.png"),
            ],
        }
    }

    fn drain(receiver: &mut UnboundedReceiver<UploadTask>) -> Vec<UploadTask> {
        let mut tasks = Vec::new();
        while let Ok(task) = receiver.try_recv() {
            tasks.push(task);
        }
        tasks
    }

    fn assert_nothing_persisted(state: &MemoryState) {
        assert!(state.products.is_empty());
        assert!(state.files.is_empty());
        assert!(state.product_files.is_empty());
        assert!(state.links.is_empty());
    }

    #[tokio::test]
    async fn test_chair_scenario() {
        let store = seeded_store();
        let (workflow, mut receiver) = workflow(store.clone());

        let created = workflow.create(&chair_input(), "u1").await.unwrap();

        assert_eq!(created.product.name, "Chair");
        assert_eq!(created.product.status, ProductStatus::Draft);
        assert!(created.product.public);
        assert_eq!(created.product.user_id, "u1");
        let color_ids: Vec<i64> = created.colors.iter().map(|c| c.id).collect();
        assert_eq!(color_ids.len(), 2);
        assert!(color_ids.contains(&3) && color_ids.contains(&4));
        assert!(created.materials.is_empty());
        assert!(created.tags.is_empty());

        let state = store.snapshot();
        let links = &state.product_files;
        assert_eq!(links.len(), 3);

        let models: Vec<_> = links.iter().filter(|pf| pf.is_model == Some(true)).collect();
        assert_eq!(models.len(), 1);
        assert_eq!(state.files[&models[0].file_id].file_name, "chair.glb");
        assert_eq!(
            state.files[&models[0].file_id].file_path,
            "products/models/chair.glb"
        );

        let images: Vec<_> = links.iter().filter(|pf| pf.is_model == Some(false)).collect();
        assert_eq!(images.len(), 2);
        assert_eq!(state.files[&images[0].file_id].file_name, "a.png");
        assert_eq!(images[0].is_thumbnail, Some(true));
        assert_eq!(state.files[&images[1].file_id].file_name, "b.png");
        assert_eq!(images[1].is_thumbnail, Some(false));

        let tasks = drain(&mut receiver);
        let categories: Vec<_> = tasks.iter().map(|t| t.category).collect();
        assert_eq!(
            categories,
            vec![
                FileCategory::Models,
                FileCategory::Images,
                FileCategory::Images
            ]
        );
        assert_eq!(tasks[1].source, staged_url("images/0191/a.png"));
    }

    #[tokio::test]
    async fn test_no_images_has_model_and_no_thumbnail() {
        let store = seeded_store();
        let (workflow, _receiver) = workflow(store.clone());
        let input = CreateProductInput {
            image_sources: vec![],
            ..chair_input()
        };

        workflow.create(&input, "u1").await.unwrap();

        let state = store.snapshot();
        assert_eq!(state.product_files.len(), 1);
        assert_eq!(state.product_files[0].is_model, Some(true));
        assert!(state
            .product_files
            .iter()
            .all(|pf| pf.is_thumbnail != Some(true)));
    }

    #[tokio::test]
    async fn test_any_image_count_yields_one_model_and_one_thumbnail() {
        for count in 0..5usize {
            let store = seeded_store();
            let (workflow, _receiver) = workflow(store.clone());
            let images: Vec<String> = (0..count)
                .map(|i| format!("{}-{}.png", Word().fake::<String>(), i))
                .collect();
            let input = CreateProductInput {
                image_sources: images
                    .iter()
                    .enumerate()
                    .map(|(i, name)| staged_url(&format!("images/{}/{}", i, name)))
                    .collect(),
                ..chair_input()
            };

            workflow.create(&input, "u1").await.unwrap();

            let state = store.snapshot();
            let models = state
                .product_files
                .iter()
                .filter(|pf| pf.is_model == Some(true))
                .count();
            let image_links: Vec<_> = state
                .product_files
                .iter()
                .filter(|pf| pf.is_model != Some(true))
                .collect();
            assert_eq!(models, 1);
            assert_eq!(image_links.len(), count);
            for (position, link) in image_links.iter().enumerate() {
                assert_eq!(link.is_thumbnail, Some(position == 0));
                assert_eq!(state.files[&link.file_id].file_name, images[position]);
            }
        }
    }

    #[tokio::test]
    async fn test_failure_on_second_image_persists_nothing() {
        // model is the first file insert, a.png the second, b.png the third
        let store = seeded_store().failing_file_insert(3);
        let (workflow, mut receiver) = workflow(store.clone());

        let err = workflow.create(&chair_input(), "u1").await.unwrap_err();

        assert!(matches!(err, AppError::CreationFailed(ref msg) if msg.contains("b.png")));
        assert_nothing_persisted(&store.snapshot());
        // tasks queued before the failure stay queued for the worker to discard
        assert_eq!(drain(&mut receiver).len(), 2);
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_original_error() {
        let store = seeded_store().failing_file_insert(1).failing_rollback();
        let (workflow, _receiver) = workflow(store.clone());

        let err = workflow.create(&chair_input(), "u1").await.unwrap_err();

        let AppError::CreationFailed(msg) = err else {
            panic!("expected creation failure, got {:?}", err);
        };
        assert!(msg.contains("injected failure inserting file chair.glb"));
        assert!(!msg.contains("rollback"));
        assert_nothing_persisted(&store.snapshot());
    }

    #[tokio::test]
    async fn test_unknown_color_is_validation_error() {
        let store = seeded_store();
        let (workflow, mut receiver) = workflow(store.clone());
        let input = CreateProductInput {
            color_ids: vec![3, 404],
            ..chair_input()
        };

        let err = workflow.create(&input, "u1").await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_nothing_persisted(&store.snapshot());
        assert!(drain(&mut receiver).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_category_is_validation_error() {
        let store = seeded_store();
        let (workflow, _receiver) = workflow(store.clone());
        let input = CreateProductInput {
            category_id: 2,
            ..chair_input()
        };

        let err = workflow.create(&input, "u1").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_blank_model_reference_rolls_back() {
        let store = seeded_store();
        let (workflow, _receiver) = workflow(store.clone());
        let input = CreateProductInput {
            model_source: staged_url("models/"),
            ..chair_input()
        };

        let err = workflow.create(&input, "u1").await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_nothing_persisted(&store.snapshot());
    }

    #[tokio::test]
    async fn test_external_image_url_rolls_back() {
        let store = seeded_store();
        let (workflow, mut receiver) = workflow(store.clone());
        let input = CreateProductInput {
            image_sources: vec![
                staged_url("images/0191/a.png"),
                "http://169.254.169.254/latest/meta-data/secret.png".to_string(),
            ],
            ..chair_input()
        };

        let err = workflow.create(&input, "u1").await.unwrap_err();

        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("not a staged upload")));
        assert_nothing_persisted(&store.snapshot());
        let tasks = drain(&mut receiver);
        assert!(tasks.iter().all(|t| !t.source.contains("169.254")));
    }

    #[tokio::test]
    async fn test_closed_queue_rolls_back() {
        let store = seeded_store();
        let (workflow, receiver) = workflow(store.clone());
        drop(receiver);

        let err = workflow.create(&chair_input(), "u1").await.unwrap_err();

        assert!(matches!(err, AppError::CreationFailed(_)));
        assert_nothing_persisted(&store.snapshot());
    }

    #[tokio::test]
    async fn test_all_association_kinds_attached() {
        let store = seeded_store();
        let (workflow, _receiver) = workflow(store.clone());
        let input = CreateProductInput {
            color_ids: vec![3],
            material_ids: vec![8, 8],
            tag_ids: vec![11],
            ..chair_input()
        };

        let created = workflow.create(&input, "u1").await.unwrap();

        assert_eq!(created.colors.len(), 1);
        assert_eq!(created.materials.len(), 1);
        assert_eq!(created.materials[0].name, "Oak");
        assert_eq!(created.tags[0].name, "Indoor");
        assert_eq!(store.snapshot().attach_inserts, 3);
    }
}
