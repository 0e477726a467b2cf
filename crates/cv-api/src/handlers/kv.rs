//! Development-only record store passthrough
//!
//! Direct read/write access to the store, keyed by an arbitrary string.
//! These routes are only mounted when `dev_endpoints` is enabled; they are
//! for seeding and inspecting records during local development.

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct KvPutRequest {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct KvPutResponse {
    pub success: bool,
}

pub async fn kv_put_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<KvPutRequest>,
) -> Result<Json<KvPutResponse>, AppError> {
    let raw = serde_json::to_string(&body.value)
        .map_err(|e| state.app_error(cv_core::CoreError::Store(e.to_string())))?;
    state
        .store
        .put(&body.key, &raw)
        .await
        .map_err(|e| state.app_error(e))?;

    Ok(Json(KvPutResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct KvGetRequest {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct KvGetResponse {
    pub value: Value,
}

pub async fn kv_get_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<KvGetRequest>,
) -> Result<Json<KvGetResponse>, AppError> {
    let raw = state
        .store
        .get(&body.key)
        .await
        .map_err(|e| state.app_error(e))?
        .ok_or_else(|| AppError::NotFound("Key".to_string()))?;

    let value = serde_json::from_str(&raw)
        .map_err(|e| state.app_error(cv_core::CoreError::Store(e.to_string())))?;

    Ok(Json(KvGetResponse { value }))
}
