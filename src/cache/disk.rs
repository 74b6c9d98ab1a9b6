//! Filesystem-backed cache store.
//!
//! One file per key, named by the key's hex digest. Writers publish through a
//! temporary file and a rename, so a reader holding an open handle always sees
//! a complete entry. The file's modification time is the entry's `stored_at`.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncReadExt;

use super::{is_fresh, CacheEntry, CacheError, CacheKey, CacheStore};

const TEMP_PREFIX: &str = ".tmp-";

/// Cache store rooted at a directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final location of the entry for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    fn temp_path(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(format!("{TEMP_PREFIX}{}-{:016x}", key, fastrand::u64(..)))
    }

    /// Create the cache directory ahead of the first write.
    pub async fn init(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    async fn read_entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let mut file = match fs::File::open(self.entry_path(key)).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Metadata and contents come from the same handle, so a concurrent
        // rename cannot pair one entry's timestamp with another's body.
        let stored_at = file.metadata().await?.modified()?;
        if !is_fresh(stored_at, SystemTime::now()) {
            return Ok(None);
        }

        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;
        CacheEntry::decode(key.clone(), &data, stored_at).map(Some)
    }
}

#[async_trait]
impl CacheStore for DiskCache {
    async fn get_if_fresh(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.read_entry(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Unreadable cache entry, treating as miss");
                None
            }
        }
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).await?;

        let temp = self.temp_path(&entry.key);
        if let Err(e) = fs::write(&temp, entry.encode()).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp, self.entry_path(&entry.key)).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::trace!(key = %entry.key, bytes = entry.body.len(), "Cache entry published");
        Ok(())
    }

    async fn clear_all(&self) -> Result<usize, CacheError> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(item) = dir.next_entry().await? {
            if !item.file_type().await?.is_file() {
                continue;
            }
            let is_temp = item
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(TEMP_PREFIX));
            match fs::remove_file(item.path()).await {
                Ok(()) if !is_temp => removed += 1,
                Ok(()) => {}
                // Raced with another clear.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}
