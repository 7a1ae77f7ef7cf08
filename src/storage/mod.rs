// Local content store for uploaded files

use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{AppError, AppResult};

const PDF_DIR: &str = "pdfs";

/// Stores raw uploads beneath a media root. Names are random so uploads
/// sharing an original filename never collide.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory layout if it is missing.
    pub async fn init(&self) -> AppResult<()> {
        fs::create_dir_all(self.root.join(PDF_DIR)).await?;
        Ok(())
    }

    /// Write the bytes under a fresh name and return the reference to store.
    pub async fn save_pdf(&self, data: &[u8]) -> AppResult<String> {
        let key = format!("{}/{}.pdf", PDF_DIR, Uuid::new_v4());
        let path = self.resolve(&key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        debug!(key = %key, bytes = data.len(), "Stored upload");
        Ok(key)
    }

    /// Read a stored file back. A missing file is `None`, not an error.
    pub async fn read(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(key = %key, "Stored file already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // Keys come from the database; refuse anything that escapes the root.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::Internal(format!("invalid storage key: {}", key)));
        }
        Ok(self.root.join(relative))
    }
}
