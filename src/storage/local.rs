use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWriteExt};

use super::traits::{BlobStore, FileRef};
use crate::error::StorageError;
use crate::session::ConversationId;

/// Filesystem blob store: one directory per conversation under `root`.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, conversation: ConversationId) -> PathBuf {
        self.root.join(conversation.to_string())
    }

    /// Remove every conversation namespace left behind by a previous process.
    ///
    /// Only directories named like a conversation id are touched.
    pub async fn purge_stale(&self) -> Result<usize, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::io("read_dir", &self.root, e)),
        };

        let mut purged = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io("read_dir", &self.root, e))?
        {
            let path = entry.path();
            let is_namespace = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.parse::<i64>().is_ok());
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            if !is_namespace || !is_dir {
                continue;
            }
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|e| StorageError::io("remove_dir_all", &path, e))?;
            purged += 1;
        }

        Ok(purged)
    }

    async fn write_unique(
        &self,
        conversation: ConversationId,
        suggested_name: &str,
        bytes: &[u8],
    ) -> Result<FileRef, StorageError> {
        validate_name(suggested_name)?;
        let dir = self.namespace_dir(conversation);
        let tmp = dir.join(format!(".{}.part", uuid::Uuid::new_v4().simple()));

        write_temp(&tmp, bytes).await?;

        let target = match unique_path(&dir, suggested_name).await {
            Ok(target) => target,
            Err(e) => {
                remove_quietly(&tmp).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            remove_quietly(&tmp).await;
            return Err(StorageError::io("rename", &target, e));
        }

        Ok(FileRef::new(conversation, target))
    }

    async fn list_namespace(
        &self,
        conversation: ConversationId,
    ) -> Result<Vec<FileRef>, StorageError> {
        let dir = self.namespace_dir(conversation);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io("read_dir", &dir, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io("read_dir", &dir, e))?
        {
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if !hidden && is_file {
                files.push(FileRef::new(conversation, entry.path()));
            }
        }
        files.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(files)
    }
}

impl BlobStore for LocalBlobStore {
    fn ensure_namespace<'a>(
        &'a self,
        conversation: ConversationId,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            let dir = self.namespace_dir(conversation);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| StorageError::io("create_dir_all", dir, e))
        })
    }

    fn write_file<'a>(
        &'a self,
        conversation: ConversationId,
        suggested_name: &'a str,
        bytes: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<FileRef, StorageError>> + Send + 'a>> {
        Box::pin(self.write_unique(conversation, suggested_name, bytes))
    }

    fn read_all<'a>(
        &'a self,
        file: &'a FileRef,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, StorageError>> + Send + 'a>> {
        Box::pin(async move {
            tokio::fs::read(file.path())
                .await
                .map_err(|e| StorageError::io("read", file.path(), e))
        })
    }

    fn delete_file<'a>(
        &'a self,
        file: &'a FileRef,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            tokio::fs::remove_file(file.path())
                .await
                .map_err(|e| StorageError::io("remove_file", file.path(), e))
        })
    }

    fn list<'a>(
        &'a self,
        conversation: ConversationId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FileRef>, StorageError>> + Send + 'a>> {
        Box::pin(self.list_namespace(conversation))
    }
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains("..");
    if bad {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// First free name among `name`, `stem-1.ext`, `stem-2.ext`, ...
///
/// Callers serialize writes per conversation, so check-then-rename does not race.
async fn unique_path(dir: &Path, name: &str) -> Result<PathBuf, StorageError> {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    let mut candidate = dir.join(name);
    let mut suffix = 1_u32;
    while tokio::fs::try_exists(&candidate)
        .await
        .map_err(|e| StorageError::io("stat", &candidate, e))?
    {
        let next = match ext {
            Some(ext) => format!("{stem}-{suffix}.{ext}"),
            None => format!("{stem}-{suffix}"),
        };
        candidate = dir.join(next);
        suffix += 1;
    }
    Ok(candidate)
}

/// Copy `source` into a fresh file at `tmp`. On failure nothing is left behind.
async fn write_temp(tmp: &Path, mut source: impl AsyncRead + Unpin) -> Result<(), StorageError> {
    let written = async {
        let mut file = tokio::fs::File::create(tmp).await?;
        tokio::io::copy(&mut source, &mut file).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        remove_quietly(tmp).await;
        return Err(StorageError::io("write", tmp, e));
    }
    Ok(())
}

async fn remove_quietly(path: &Path) {
    if let Err(error) = tokio::fs::remove_file(path).await {
        tracing::trace!(path = %path.display(), %error, "failed to remove temp file");
    }
}
