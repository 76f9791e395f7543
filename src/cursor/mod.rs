// src/cursor/mod.rs
//! Persistence for the id of the last forwarded post.
//!
//! A file is always available. A key-value backend, when configured, is tried
//! first for both reads and writes and the file catches whatever it drops.

pub mod file;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use metrics::counter;

use crate::error::CursorError;

pub use file::FileCursor;
#[cfg(feature = "postgres")]
pub use postgres::PgCursor;

#[async_trait]
pub trait CursorBackend: Send + Sync {
    /// `None` when nothing has been stored yet.
    async fn load(&self) -> Result<Option<String>, CursorError>;
    async fn save(&self, id: &str) -> Result<(), CursorError>;
    fn name(&self) -> &'static str;
}

pub struct CursorStore {
    file: FileCursor,
    kv: Option<Box<dyn CursorBackend>>,
}

impl CursorStore {
    pub fn new(file: FileCursor) -> Self {
        Self { file, kv: None }
    }

    pub fn with_kv(mut self, kv: Box<dyn CursorBackend>) -> Self {
        self.kv = Some(kv);
        self
    }

    /// Last forwarded id, or "" on first run.
    pub async fn load(&self) -> String {
        if let Some(kv) = &self.kv {
            match kv.load().await {
                Ok(Some(v)) if !v.is_empty() => return v,
                Ok(_) => tracing::debug!(backend = kv.name(), "no cursor in kv store"),
                Err(e) => tracing::warn!(backend = kv.name(), error = %e, "cursor kv load failed"),
            }
        }
        match self.file.load().await {
            Ok(v) => v.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, path = %self.file.path().display(), "cursor file load failed");
                String::new()
            }
        }
    }

    pub async fn save(&self, id: &str) -> Result<(), CursorError> {
        if let Some(kv) = &self.kv {
            match kv.save(id).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(backend = kv.name(), error = %e, "cursor kv save failed; using file")
                }
            }
        }
        self.file.save(id).await.map_err(|e| {
            counter!("relay_cursor_persist_errors_total").increment(1);
            tracing::error!(error = %e, path = %self.file.path().display(), "cursor file save failed");
            if self.kv.is_some() {
                CursorError::AllBackendsFailed
            } else {
                e
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryKv {
        value: Mutex<Option<String>>,
        broken: bool,
    }

    #[async_trait]
    impl CursorBackend for MemoryKv {
        async fn load(&self) -> Result<Option<String>, CursorError> {
            if self.broken {
                return Err(CursorError::AllBackendsFailed);
            }
            Ok(self.value.lock().unwrap().clone())
        }
        async fn save(&self, id: &str) -> Result<(), CursorError> {
            if self.broken {
                return Err(CursorError::AllBackendsFailed);
            }
            *self.value.lock().unwrap() = Some(id.to_string());
            Ok(())
        }
        fn name(&self) -> &'static str {
            "memory"
        }
    }

    #[tokio::test]
    async fn first_run_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CursorStore::new(FileCursor::new(dir.path().join("last.txt")));
        assert_eq!(store.load().await, "");
    }

    #[tokio::test]
    async fn save_then_load_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("last.txt");

        CursorStore::new(FileCursor::new(&path)).save("p1").await.unwrap();

        // fresh instance, as after a process restart
        let reopened = CursorStore::new(FileCursor::new(&path));
        assert_eq!(reopened.load().await, "p1");
    }

    #[tokio::test]
    async fn kv_is_preferred_when_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last.txt");
        let store = CursorStore::new(FileCursor::new(&path)).with_kv(Box::new(MemoryKv::default()));

        store.save("p9").await.unwrap();
        assert_eq!(store.load().await, "p9");
        // the file was not needed
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn broken_kv_falls_back_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last.txt");
        let kv = MemoryKv {
            broken: true,
            ..Default::default()
        };
        let store = CursorStore::new(FileCursor::new(&path)).with_kv(Box::new(kv));

        store.save("p3").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "p3");
        assert_eq!(store.load().await, "p3");
    }
}
