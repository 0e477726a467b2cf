//! CV Store - Key-value record store abstraction
//!
//! The profile embedding records live in a hosted key-value store, used as an
//! opaque get/put/list API. This crate defines the [`KvStore`] trait and two
//! implementations:
//! - [`MemoryKv`]: in-process map for development and tests
//! - [`CloudflareKv`]: Workers KV via the Cloudflare REST API
//!
//! The serving path only reads; writes come from the offline ingestion tool
//! and the development passthrough endpoints.

pub mod cloudflare;
pub mod memory;

pub use cloudflare::CloudflareKv;
pub use memory::MemoryKv;

use async_trait::async_trait;
use cv_core::{AppConfig, Result, StoreBackend};
use std::sync::Arc;

/// Opaque key-value store over string values.
///
/// Listing order is backend-defined and treated as stable enough for the
/// prefix-read retrieval the site performs; no ordering guarantee is assumed
/// beyond "same backend, same order".
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, overwriting any previous value.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// List all keys in backend order.
    async fn list_keys(&self) -> Result<Vec<String>>;
}

/// Build the configured store backend.
pub fn create_store(config: &AppConfig) -> Arc<dyn KvStore> {
    match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryKv::new()),
        StoreBackend::Cloudflare => Arc::new(CloudflareKv::from_config(&config.store)),
    }
}
