pub mod association;
pub mod product;
pub mod product_file;

pub use association::AssociationKind;
pub use product::{NewProduct, Product, ProductStatus, ProductWithRelations, PRODUCT_COLUMNS};
pub use product_file::{NewProductFile, ProductFile};
