//! Console configuration: where the state database lives.

use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = ".delivery";
pub const DATA_DIR_ENV: &str = "DELIVERY_HOME";
const DB_FILE: &str = "state.db";

#[derive(Debug, Clone)]
pub struct Config {
    data_dir: PathBuf,
}

impl Config {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_path_is_inside_data_dir() {
        let config = Config::new("/tmp/deliveries");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/deliveries/state.db"));
        assert_eq!(Config::default().data_dir(), Path::new(".delivery"));
    }
}
