use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Transient on-disk cache holding one file per fetched wishlist page.
///
/// The fetcher is the only writer; the cleanup routine is the only
/// deleter. Files are named deterministically by page index and the
/// whole directory is removed at the end of every run.
pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    /// Creates the cache directory (and parents) if it does not exist.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Persists the raw JSON payload of one page to its cache slot.
    pub fn store(&self, page: usize, raw_json: &str) -> Result<PathBuf> {
        let path = self.dir.join(format!("wishlist{page}.json"));
        fs::write(&path, raw_json)
            .with_context(|| format!("Failed to write cache file {}", path.display()))?;
        debug!(page, path = %path.display(), "cached wishlist page");
        Ok(path)
    }

    /// Removes the cache directory and everything in it. Idempotent: an
    /// absent directory is not an error.
    pub fn remove(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).with_context(|| {
                format!("Failed to remove cache directory {}", self.dir.display())
            })?;
            debug!(dir = %self.dir.display(), "removed page cache");
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
