pub mod library;

pub use library::{Library, LIBRARY_COLUMNS};
