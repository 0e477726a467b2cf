//! CV Ingest - offline batch embedding of profile documents
//!
//! One-shot job, run whenever the profile documents change: each document is
//! split into paragraph chunks, an embedding is requested per chunk from a
//! local Ollama server, and one record per chunk is written to the store
//! under `"<file>-chunk-<index>"`. Re-running overwrites records in place.
//!
//! The retry here is a plain fixed-backoff loop; this is a batch tool, not a
//! resilience layer.

use anyhow::{bail, Context};
use cv_core::{record_key, EmbeddingRecord};
use cv_store::KvStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Attempts per embedding request before giving up
const RETRIES: u32 = 3;

/// Split a document into paragraph chunks on blank lines.
///
/// Runs of blank (or whitespace-only) lines separate chunks; leading and
/// trailing whitespace inside a chunk is preserved apart from the trim that
/// drops empty chunks.
pub fn split_paragraphs(content: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.trim().is_empty() {
                chunks.push(current.trim_end().to_string());
            }
            current.clear();
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.trim().is_empty() {
        chunks.push(current.trim_end().to_string());
    }

    chunks
}

// ============================================================================
// Ollama Embedding Client
// ============================================================================

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Client for the Ollama `/api/embed` endpoint
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Check that the server is up and the model answers a trial request.
    pub async fn check_available(&self) -> anyhow::Result<()> {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .context("Ollama is not running; start it with: ollama serve")?;

        self.embed("test")
            .await
            .with_context(|| format!("model {} not available; pull it with: ollama pull {}", self.model, self.model))?;
        Ok(())
    }

    /// Request one embedding, retrying with fixed backoff.
    pub async fn embed(&self, input: &str) -> anyhow::Result<Vec<f32>> {
        let mut last_err = None;

        for attempt in 1..=RETRIES {
            match self.embed_once(input).await {
                Ok(vector) => {
                    tracing::debug!(attempt, dims = vector.len(), "embedding generated");
                    return Ok(vector);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "embedding request failed");
                    last_err = Some(e);
                    if attempt < RETRIES {
                        tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("embedding failed")))
    }

    async fn embed_once(&self, input: &str) -> anyhow::Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&EmbedRequest {
                model: &self.model,
                input,
            })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            bail!("HTTP {status}: {text}");
        }

        let parsed: EmbedResponse =
            serde_json::from_str(&text).with_context(|| "JSON parse failed")?;
        parsed
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty embeddings array"))
    }
}

// ============================================================================
// Ingestion
// ============================================================================

/// Embed and store every chunk of one document. Returns the chunk count.
pub async fn ingest_document(
    embedder: &OllamaEmbedder,
    store: &dyn KvStore,
    file_name: &str,
    content: &str,
) -> anyhow::Result<usize> {
    let chunks = split_paragraphs(content);
    tracing::info!(file = file_name, chunks = chunks.len(), "processing document");

    for (index, chunk) in chunks.iter().enumerate() {
        let vector = embedder
            .embed(chunk)
            .await
            .with_context(|| format!("failed to embed {file_name} chunk {index}"))?;

        let record = EmbeddingRecord {
            content: chunk.clone(),
            vector,
            file: file_name.to_string(),
            chunk_index: index,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let key = record_key(file_name, index);
        store
            .put(&key, &serde_json::to_string(&record)?)
            .await
            .map_err(|e| anyhow::anyhow!("failed to store {key}: {e}"))?;
        tracing::info!(%key, chars = chunk.len(), "stored record");
    }

    Ok(chunks.len())
}

/// Ingest every file in a directory. Returns the total chunk count.
pub async fn ingest_dir(
    embedder: &OllamaEmbedder,
    store: &dyn KvStore,
    docs_dir: &Path,
) -> anyhow::Result<usize> {
    let mut entries = tokio::fs::read_dir(docs_dir)
        .await
        .with_context(|| format!("cannot read docs dir {}", docs_dir.display()))?;

    let mut total = 0;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let content = tokio::fs::read_to_string(entry.path())
            .await
            .with_context(|| format!("cannot read {}", entry.path().display()))?;

        total += ingest_document(embedder, store, &file_name, &content).await?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_blank_lines() {
        let chunks = split_paragraphs("first para\n\nsecond para\n\n\nthird");
        assert_eq!(chunks, vec!["first para", "second para", "third"]);
    }

    #[test]
    fn test_multiline_paragraph_kept_together() {
        let chunks = split_paragraphs("line one\nline two\n\nnext");
        assert_eq!(chunks, vec!["line one\nline two", "next"]);
    }

    #[test]
    fn test_whitespace_only_lines_separate() {
        let chunks = split_paragraphs("a\n   \nb");
        assert_eq!(chunks, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_document_yields_no_chunks() {
        assert!(split_paragraphs("").is_empty());
        assert!(split_paragraphs("\n\n\n").is_empty());
    }

    #[test]
    fn test_embed_response_parse() {
        let response: EmbedResponse =
            serde_json::from_str(r#"{"embeddings": [[0.1, 0.2, 0.3]]}"#).unwrap();
        assert_eq!(response.embeddings[0].len(), 3);
    }
}
