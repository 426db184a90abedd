use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::TripError;

/// Storage key for the serialized offline queue.
pub const QUEUE_KEY: &str = "offline_queue";
/// Storage key for the last-known user trip list.
pub const TRIPS_CACHE_KEY: &str = "trips_cache";
/// Storage key for operations given up on after repeated stalled passes.
pub const DEAD_LETTER_KEY: &str = "dead_letter";

/// Minimal durable key-value surface the engine persists through.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn set_item(&self, key: &str, value: String) -> Result<(), TripError>;
    async fn get_item(&self, key: &str) -> Result<Option<String>, TripError>;
    async fn remove_item(&self, key: &str) -> Result<(), TripError>;
}

/// Volatile store for tests and the demo binary.
#[derive(Default)]
pub struct MemoryStore {
    items: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn set_item(&self, key: &str, value: String) -> Result<(), TripError> {
        self.items.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, TripError> {
        Ok(self.items.get(key).map(|v| v.clone()))
    }

    async fn remove_item(&self, key: &str) -> Result<(), TripError> {
        self.items.remove(key);
        Ok(())
    }
}

/// One JSON file per key under a data directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, TripError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| TripError::Storage(format!("cannot create {}: {err}", dir.display())))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KvStore for JsonFileStore {
    async fn set_item(&self, key: &str, value: String) -> Result<(), TripError> {
        let path = self.path_for(key);
        tokio::fs::write(&path, value)
            .await
            .map_err(|err| TripError::Storage(format!("write {} failed: {err}", path.display())))
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, TripError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(TripError::Storage(format!(
                "read {} failed: {err}",
                path.display()
            ))),
        }
    }

    async fn remove_item(&self, key: &str) -> Result<(), TripError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(TripError::Storage(format!(
                "remove {} failed: {err}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryStore::new();
        store.set_item("k", "v".to_string()).await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("v"));

        store.remove_item("k").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();

        assert_eq!(store.get_item(QUEUE_KEY).await.unwrap(), None);

        store
            .set_item(QUEUE_KEY, "[1,2,3]".to_string())
            .await
            .unwrap();
        assert_eq!(
            store.get_item(QUEUE_KEY).await.unwrap().as_deref(),
            Some("[1,2,3]")
        );

        store.remove_item(QUEUE_KEY).await.unwrap();
        assert_eq!(store.get_item(QUEUE_KEY).await.unwrap(), None);

        // removing a missing key is not an error
        store.remove_item("nope").await.unwrap();
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonFileStore::open(dir.path()).await.unwrap();
            store
                .set_item(TRIPS_CACHE_KEY, "[]".to_string())
                .await
                .unwrap();
        }

        let reopened = JsonFileStore::open(dir.path()).await.unwrap();
        assert_eq!(
            reopened.get_item(TRIPS_CACHE_KEY).await.unwrap().as_deref(),
            Some("[]")
        );
    }
}
