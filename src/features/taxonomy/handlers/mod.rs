pub mod taxonomy_handler;

pub use taxonomy_handler::*;
