//! Content-addressable storage for generated media bytes.
//!
//! Generated images and narrated audio are stored by SHA-256 hash under
//! `{base}/{kind}/{hash[0:2]}/{hash[2:4]}/{hash}`, giving automatic
//! deduplication; writes go through a temp file and rename.

use limner_error::{LimnerResult, StorageError, StorageErrorKind};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Kind of generated media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Generated chunk illustration.
    Image,
    /// Narrated chunk audio.
    Audio,
}

impl MediaKind {
    /// Directory name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Audio => "audio",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to stored media bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    /// SHA-256 hash of the content.
    pub content_hash: String,
    /// Filesystem path to the stored bytes.
    pub path: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Kind of media.
    pub kind: MediaKind,
}

/// Filesystem media store.
#[derive(Debug, Clone)]
pub struct MediaStore {
    base_path: PathBuf,
}

impl MediaStore {
    /// Create a media store rooted at `base_path`, creating the directory
    /// if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> LimnerResult<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;
        tracing::info!(path = %base_path.display(), "Created media store");
        Ok(Self { base_path })
    }

    fn compute_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    /// Structure: `{base}/{kind}/{hash[0:2]}/{hash[2:4]}/{hash}`
    fn path_for(&self, hash: &str, kind: MediaKind) -> PathBuf {
        self.base_path
            .join(kind.as_str())
            .join(&hash[0..2])
            .join(&hash[2..4])
            .join(hash)
    }

    /// Store media bytes and return a reference.
    ///
    /// Identical content hashes to the same path, so storing twice is a
    /// cheap no-op returning the existing reference.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the atomic
    /// write fails.
    #[tracing::instrument(skip(self, data), fields(size = data.len(), kind = %kind))]
    pub async fn store(&self, data: &[u8], kind: MediaKind) -> LimnerResult<MediaRef> {
        let hash = Self::compute_hash(data);
        let path = self.path_for(&hash, kind);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(hash = %hash, "Media already exists, returning existing reference");
            return Ok(MediaRef {
                content_hash: hash,
                path: path.to_string_lossy().to_string(),
                size_bytes: data.len() as u64,
                kind,
            });
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, data).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;
        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::info!(hash = %hash, path = %path.display(), size = data.len(), "Stored media file");
        Ok(MediaRef {
            content_hash: hash,
            path: path.to_string_lossy().to_string(),
            size_bytes: data.len() as u64,
            kind,
        })
    }

    /// Retrieve stored bytes, verifying the content hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or fails hash
    /// verification.
    #[tracing::instrument(skip(self, reference), fields(hash = %reference.content_hash))]
    pub async fn retrieve(&self, reference: &MediaRef) -> LimnerResult<Vec<u8>> {
        let path = Path::new(&reference.path);
        let data = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(reference.path.clone()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;

        let actual = Self::compute_hash(&data);
        if actual != reference.content_hash {
            return Err(StorageError::new(StorageErrorKind::HashMismatch(format!(
                "expected {}, got {}",
                reference.content_hash, actual
            )))
            .into());
        }
        Ok(data)
    }

    /// Check whether the referenced media exists on disk.
    pub async fn exists(&self, reference: &MediaRef) -> bool {
        tokio::fs::try_exists(Path::new(&reference.path))
            .await
            .unwrap_or(false)
    }
}
