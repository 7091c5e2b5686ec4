//! # Local media storage
//!
//! Local filesystem implementation of `MediaStorage`. Paths handed in by
//! the core are relative to `root`; anything that could escape it is
//! rejected.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use domains::{DomainError, MediaPath, MediaStorage, Result};
use tokio::fs;
use tracing::debug;

pub struct LocalMediaStorage {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &MediaPath) -> Result<PathBuf> {
        path.ensure_contained()?;
        Ok(self.root.join(path.as_str()))
    }
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn remove(&self, path: &MediaPath) -> Result<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => {
                debug!(path = %target.display(), "media removed");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => {
                if is_dir(&target).await {
                    return Err(DomainError::Validation(format!(
                        "media path {path} names a directory"
                    )));
                }
                Err(DomainError::storage(format!(
                    "removing {}: {err}",
                    target.display()
                )))
            }
        }
    }
}
