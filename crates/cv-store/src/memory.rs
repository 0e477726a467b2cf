//! In-process key-value store for development and tests

use crate::KvStore;
use async_trait::async_trait;
use cv_core::Result;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// In-memory store backed by a `BTreeMap`.
///
/// Keys list in lexicographic order, which keeps the prefix-read retrieval
/// deterministic in tests.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from key/value pairs.
    pub fn seeded(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: Mutex::new(pairs.into_iter().collect()),
        }
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = MemoryKv::new();
        store.put("doc.txt-chunk-0", r#"{"a":1}"#).await.unwrap();

        let value = store.get("doc.txt-chunk-0").await.unwrap();
        assert_eq!(value.as_deref(), Some(r#"{"a":1}"#));
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryKv::new();
        store.put("k", "v1").await.unwrap();
        store.put("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_list_keys_sorted() {
        let store = MemoryKv::new();
        store.put("b", "2").await.unwrap();
        store.put("a", "1").await.unwrap();
        store.put("c", "3").await.unwrap();

        assert_eq!(store.list_keys().await.unwrap(), vec!["a", "b", "c"]);
    }
}
