pub mod file;

pub use file::{File, FileCategory, NewFile, FILE_COLUMNS};
