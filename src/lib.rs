#[macro_use]
extern crate log;
#[macro_use]
extern crate quick_error;
extern crate fxhash;
extern crate slog;
extern crate slog_async;
extern crate slog_term;

pub mod cache;
pub mod db;
mod error;
mod logger;
pub mod options;
pub mod table_cache;
mod util;
pub mod version;

pub use cache::Cache;
pub use db::format::{InternalKey, InternalKeyComparator, ParsedInternalKey, ValueType};
pub use error::{Error, Result};
pub use log::{LevelFilter, Log};
pub use logger::Logger;
pub use options::Options;
pub use table_cache::{
    FileTableOpener, LRUTableCache, ReleaseHandle, TableCache, TableHandle, TableOpener,
    TableReader,
};
pub use util::comparator::{BytewiseComparator, Comparator};
pub use version::consistency::{check_consistency, check_consistency_for_deletes};
pub use version::version_builder::VersionBuilder;
pub use version::version_edit::{FileMetaData, VersionEdit};
pub use version::{FileOrder, VersionStorageInfo};
