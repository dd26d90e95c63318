//! Filesystem-backed object store: one bucket directory, one file per key.

use std::io;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use super::{ByteStream, ObjectStore, StoreError};

/// Local object store rooted at a bucket directory
///
/// Uploads land in a temporary file beside their final path and are renamed
/// into place only once the payload stream is fully consumed; a dropped or
/// truncated stream removes the temporary file and leaves no visible
/// object.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to its on-disk path, refusing anything that could
    /// escape the bucket
    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key.split('/').all(|part| {
                !part.is_empty() && part != "." && part != ".." && !part.contains('\\')
            });
        if !valid {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid object key: {key:?}"),
            )));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait::async_trait]
impl ObjectStore for FsObjectStore {
    async fn ensure_bucket(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        tracing::info!("Object store bucket ready at {:?}", self.root);
        Ok(())
    }

    async fn put(
        &self,
        key: &str,
        size_hint: Option<u64>,
        mut body: ByteStream<'_>,
    ) -> Result<u64, StoreError> {
        let path = self.object_path(key)?;
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        tokio::fs::create_dir_all(&parent).await?;

        // The temp file is removed on drop, so every early return below
        // leaves the bucket without a trace of this upload.
        let tmp = NamedTempFile::new_in(&parent)?;
        let mut file = tokio::fs::File::from_std(tmp.reopen()?);

        let mut written: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;

        if let Some(expected) = size_hint {
            if written != expected {
                return Err(StoreError::Truncated { written, expected });
            }
        }

        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(written)
    }

    async fn get(&self, key: &str) -> Result<ByteStream<'static>, StoreError> {
        let path = self.object_path(key)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(e.into()),
        };
        Ok(ReaderStream::new(file).boxed())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
