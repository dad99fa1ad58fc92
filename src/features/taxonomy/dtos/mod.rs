mod taxonomy_dto;

pub use taxonomy_dto::{like_pattern, SearchQuery, TaxonomyItemDto, UpsertTaxonomyItemDto};
