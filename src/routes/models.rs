//! Models endpoint
//!
//! Lists the provider models available for the configured vendor in the
//! OpenAI `/v1/models` shape, so clients can discover valid model names.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{error::ProxyError, AppState};

/// A model entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelObject {
    /// Model family, usable as the `model` field of a chat request
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

/// List of models
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelObject>,
}

/// `GET /v1/models`
pub async fn list_models(State(state): State<Arc<AppState>>) -> Result<Json<ModelList>, ProxyError> {
    let models = state.resolver.available_models().await?;

    let data = models
        .iter()
        .map(|model| {
            let info = model.info();
            ModelObject {
                id: info.family.clone(),
                object: "model".to_string(),
                created: 0,
                owned_by: info.vendor.clone(),
            }
        })
        .collect();

    Ok(Json(ModelList {
        object: "list".to_string(),
        data,
    }))
}
