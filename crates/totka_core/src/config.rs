//! Store location resolution.
//!
//! Precedence: explicit host value, then `TOTKA_DB_PATH`, then a file in
//! the system temp directory.

use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "TOTKA_DB_PATH";
pub const DEFAULT_DB_FILE_NAME: &str = "totka.sqlite3";

/// Resolves the store database path. Blank values are ignored.
pub fn resolve_db_path(explicit: Option<&str>) -> PathBuf {
    let from_env = std::env::var(DB_PATH_ENV).ok();
    let resolved = [explicit, from_env.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(PathBuf::from);
    resolved.unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME))
}
