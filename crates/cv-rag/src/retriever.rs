//! Context retrieval over the record store
//!
//! Lists all keys, reads the first N in listing order, and collects the
//! `content` field of each record that parses. Individual parse failures are
//! logged and skipped so one corrupt record cannot take down the endpoint.

use cv_core::{EmbeddingRecord, Result};
use cv_store::KvStore;

/// Read up to `max_records` stored records and extract their text.
pub async fn retrieve_context(store: &dyn KvStore, max_records: usize) -> Result<Vec<String>> {
    let keys = store.list_keys().await?;
    tracing::debug!(total_keys = keys.len(), "listed record store keys");

    let mut chunks = Vec::new();
    for key in keys.iter().take(max_records) {
        let Some(raw) = store.get(key).await? else {
            continue;
        };

        match serde_json::from_str::<EmbeddingRecord>(&raw) {
            Ok(record) if !record.content.is_empty() => chunks.push(record.content),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to parse stored record, skipping");
            }
        }
    }

    tracing::debug!(chunks = chunks.len(), "retrieved context chunks");
    Ok(chunks)
}
