mod taxonomy;

pub use taxonomy::{TaxonomyItem, TaxonomyKind};
