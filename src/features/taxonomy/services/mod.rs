mod taxonomy_service;

pub use taxonomy_service::TaxonomyService;
