pub mod filename;
pub mod format;
