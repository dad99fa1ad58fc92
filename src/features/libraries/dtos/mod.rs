pub mod library_dto;

pub use library_dto::*;
