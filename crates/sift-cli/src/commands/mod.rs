//! Command implementations.

pub mod config;
pub mod extract;
pub mod graph;
pub mod items;
pub mod related;

pub use self::config::execute_config;
pub use self::extract::execute_extract;
pub use self::graph::execute_graph;
pub use self::items::execute_items;
pub use self::related::execute_related;

use crate::config::Config;
use crate::error::Result;
use sift_store::SqliteStore;
use std::fs;
use tracing::debug;

/// Open the configured database, creating its directory if needed.
pub fn open_store(config: &Config) -> Result<SqliteStore> {
    let path = config.database_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    debug!("Opening database {}", path.display());
    Ok(SqliteStore::new(&path)?)
}
