use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Resolve the database location. An explicit path (from `--db` or
    /// `BASKET_DB`) wins over the platform data directory.
    pub fn load(db_override: Option<&Path>) -> Result<Self> {
        let db_path = match db_override {
            Some(path) => path.to_path_buf(),
            None => {
                let proj_dirs = ProjectDirs::from("", "", "basket")
                    .context("Could not determine home directory")?;
                proj_dirs.data_dir().join("basket.db")
            }
        };

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }

        Ok(Config { db_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_creates_parent_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("dir").join("shop.db");
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.db_path, path);
        assert!(tmp.path().join("nested").join("dir").is_dir());
    }

    #[test]
    fn test_relative_override_without_parent() {
        let config = Config::load(Some(Path::new("shop.db"))).unwrap();
        assert_eq!(config.db_path, PathBuf::from("shop.db"));
    }
}
