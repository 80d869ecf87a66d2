use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::fs;

use crate::domain::repository::LocalMediaSource;

#[derive(Clone)]
pub struct FilesystemMediaSource {
    root: PathBuf,
}

impl FilesystemMediaSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl LocalMediaSource for FilesystemMediaSource {
    fn documents_root(&self) -> PathBuf {
        self.root.clone()
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> Result<Bytes> {
        let bytes = fs::read(path)
            .await
            .with_context(|| format!("read file {:?}", path))?;
        Ok(Bytes::from(bytes))
    }
}
