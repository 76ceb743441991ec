//! Data directory layout.
//!
//! ```text
//! {data_dir}/
//!   config.toml
//!   isonnik.db            (SQLite storage)
//!   profiles/{profile}/   (file storage, one file per key)
//! ```

use std::path::{Path, PathBuf};

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `ISONNIK_DATA_DIR` environment variable
/// 2. `~/.isonnik` under the home directory
/// 3. `.isonnik` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ISONNIK_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".isonnik");
    }

    PathBuf::from(".isonnik")
}

/// `{data_dir}/profiles/{profile}/`
pub fn profile_dir(data_dir: &Path, profile: &str) -> PathBuf {
    data_dir.join("profiles").join(profile)
}

/// `{data_dir}/isonnik.db`
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join("isonnik.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let root = Path::new("/data");
        assert_eq!(profile_dir(root, "work"), PathBuf::from("/data/profiles/work"));
        assert_eq!(database_path(root), PathBuf::from("/data/isonnik.db"));
    }
}
