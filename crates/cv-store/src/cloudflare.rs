//! Cloudflare Workers KV implementation
//!
//! Talks to the Cloudflare REST API directly. Values are stored verbatim as
//! the request body; listing paginates with the API cursor until exhausted.

use crate::KvStore;
use async_trait::async_trait;
use cv_core::{CoreError, Result, StoreConfig};
use reqwest::{StatusCode, Url};
use serde::Deserialize;

const API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Workers KV namespace client
pub struct CloudflareKv {
    client: reqwest::Client,
    base_url: String,
    account_id: String,
    namespace_id: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct ListKeysResponse {
    success: bool,
    #[serde(default)]
    result: Vec<KeyEntry>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct KeyEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    cursor: Option<String>,
}

impl CloudflareKv {
    pub fn new(
        account_id: impl Into<String>,
        namespace_id: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: API_BASE.to_string(),
            account_id: account_id.into(),
            namespace_id: namespace_id.into(),
            api_token: api_token.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            config.cf_account_id.clone(),
            config.cf_namespace_id.clone(),
            config.cf_api_token.clone(),
        )
    }

    /// Override the API base URL (for tests against a local stub).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn namespace_url(&self) -> String {
        format!(
            "{}/accounts/{}/storage/kv/namespaces/{}",
            self.base_url, self.account_id, self.namespace_id
        )
    }

    /// URL for a single value, with the key percent-encoded as one path
    /// segment so keys containing `/`, `?`, or spaces address the right
    /// record instead of rewriting the request path.
    fn value_url(&self, key: &str) -> Result<Url> {
        let mut url = Url::parse(&self.namespace_url())
            .map_err(|e| CoreError::Store(format!("invalid KV API URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| CoreError::Store("KV API URL cannot carry a path".to_string()))?
            .push("values")
            .push(key);
        Ok(url)
    }
}

#[async_trait]
impl KvStore for CloudflareKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let url = self.value_url(key)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| CoreError::Store(format!("KV get failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CoreError::Store(format!(
                "KV get returned HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CoreError::Store(format!("KV get body read failed: {e}")))?;
        Ok(Some(body))
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let url = self.value_url(key)?;
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.api_token)
            .body(value.to_string())
            .send()
            .await
            .map_err(|e| CoreError::Store(format!("KV put failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CoreError::Store(format!(
                "KV put returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{}/keys", self.namespace_url()))
                .bearer_auth(&self.api_token);
            if let Some(ref c) = cursor {
                request = request.query(&[("cursor", c)]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| CoreError::Store(format!("KV list failed: {e}")))?;

            if !response.status().is_success() {
                return Err(CoreError::Store(format!(
                    "KV list returned HTTP {}",
                    response.status()
                )));
            }

            let page: ListKeysResponse = response
                .json()
                .await
                .map_err(|e| CoreError::Store(format!("KV list parse failed: {e}")))?;

            if !page.success {
                return Err(CoreError::Store("KV list reported failure".to_string()));
            }

            keys.extend(page.result.into_iter().map(|k| k.name));

            cursor = page
                .result_info
                .and_then(|info| info.cursor)
                .filter(|c| !c.is_empty());
            if cursor.is_none() {
                break;
            }
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_url_shape() {
        let store = CloudflareKv::new("acct", "ns", "token");
        assert_eq!(
            store.namespace_url(),
            "https://api.cloudflare.com/client/v4/accounts/acct/storage/kv/namespaces/ns"
        );
    }

    #[test]
    fn test_value_url_plain_key() {
        let store = CloudflareKv::new("acct", "ns", "token");
        let url = store.value_url("cv.txt-chunk-0").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.cloudflare.com/client/v4/accounts/acct/storage/kv/namespaces/ns/values/cv.txt-chunk-0"
        );
    }

    #[test]
    fn test_value_url_encodes_reserved_characters() {
        let store = CloudflareKv::new("acct", "ns", "token");
        let url = store.value_url("docs/cv v2.txt-chunk-1?draft").unwrap();
        assert!(url
            .path()
            .ends_with("/values/docs%2Fcv%20v2.txt-chunk-1%3Fdraft"));
        assert!(url.query().is_none());
    }

    #[test]
    fn test_list_response_parses_cursor() {
        let page: ListKeysResponse = serde_json::from_str(
            r#"{
                "success": true,
                "result": [{"name": "cv.txt-chunk-0"}, {"name": "cv.txt-chunk-1"}],
                "result_info": {"cursor": "abc"}
            }"#,
        )
        .unwrap();
        assert!(page.success);
        assert_eq!(page.result.len(), 2);
        assert_eq!(page.result_info.unwrap().cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn test_list_response_without_result_info() {
        let page: ListKeysResponse =
            serde_json::from_str(r#"{"success": true, "result": []}"#).unwrap();
        assert!(page.result_info.is_none());
    }
}
