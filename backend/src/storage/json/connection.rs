//! Base directory handle for the JSON-file storage backend.

use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};

/// Connection to a local data directory holding the JSON stores
/// (session, per-user cycle overrides).
#[derive(Debug, Clone)]
pub struct JsonConnection {
    base_directory: PathBuf,
}

impl JsonConnection {
    /// Open (and create if needed) the data directory.
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_directory = base_directory.as_ref().to_path_buf();
        if !base_directory.exists() {
            std::fs::create_dir_all(&base_directory)?;
            info!("Created data directory {:?}", base_directory);
        }
        Ok(Self { base_directory })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Absolute path of a store file inside the data directory.
    pub fn store_path(&self, file_name: &str) -> PathBuf {
        self.base_directory.join(file_name)
    }

    /// Write a store file atomically: temp file in the same directory,
    /// then rename over the target.
    pub fn write_atomic(&self, file_name: &str, contents: &str) -> Result<()> {
        let target = self.store_path(file_name);
        let temp = target.with_extension("tmp");
        std::fs::write(&temp, contents)?;
        std::fs::rename(&temp, &target)?;
        Ok(())
    }
}
