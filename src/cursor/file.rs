// src/cursor/file.rs
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::CursorBackend;
use crate::error::CursorError;

/// Single-line text file holding the cursor.
#[derive(Debug, Clone)]
pub struct FileCursor {
    path: PathBuf,
}

impl FileCursor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl CursorBackend for FileCursor {
    async fn load(&self) -> Result<Option<String>, CursorError> {
        match fs::read_to_string(&self.path).await {
            Ok(s) => Ok(Some(s.trim().to_string()).filter(|s| !s.is_empty())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to `<path>.tmp`, then rename over the real file: readers see the
    /// old value or the new one, never a torn write.
    async fn save(&self, id: &str) -> Result<(), CursorError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, id.as_bytes()).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
