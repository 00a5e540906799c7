use crate::config::InferenceConfig;
use crate::error::{DispatchError, EdgewatchError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Reported by the inference service health endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceHealth {
    pub status: String,
    pub available_models: Vec<String>,
    pub total_models: usize,
}

/// Where the active rotation list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    Configured,
    Catalog,
    Fallback,
}

/// Read-only client for the inference service's model listing and health
pub struct ModelCatalog {
    client: reqwest::Client,
    models_url: String,
    health_url: String,
}

impl ModelCatalog {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| EdgewatchError::component("catalog", e.to_string()))?;

        Ok(Self {
            client,
            models_url: config.endpoint(&config.models_path),
            health_url: config.endpoint(&config.health_path),
        })
    }

    /// Model identifiers currently served
    pub async fn fetch(&self) -> std::result::Result<Vec<String>, DispatchError> {
        let body = self.get_json(&self.models_url).await?;
        let models = parse_model_list(&body)?;
        debug!("Catalog lists {} models", models.len());
        Ok(models)
    }

    pub async fn health(&self) -> std::result::Result<ServiceHealth, DispatchError> {
        let body = self.get_json(&self.health_url).await?;
        serde_json::from_value(body).map_err(|e| DispatchError::InvalidResponse {
            details: format!("malformed health response: {}", e),
        })
    }

    async fn get_json(&self, url: &str) -> std::result::Result<Value, DispatchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::HttpStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| DispatchError::InvalidResponse {
                details: e.to_string(),
            })
    }
}

/// Accepts a bare array of names, or an object whose `available_models` is
/// an array of names or a map keyed by name.
pub fn parse_model_list(body: &Value) -> std::result::Result<Vec<String>, DispatchError> {
    let listing = match body {
        Value::Object(object) => object.get("available_models").unwrap_or(&Value::Null),
        other => other,
    };

    let models: Vec<String> = match listing {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::Object(map) => {
            let mut names: Vec<String> = map.keys().cloned().collect();
            names.sort();
            names
        }
        _ => {
            return Err(DispatchError::InvalidResponse {
                details: "no model listing in catalog response".to_string(),
            })
        }
    };

    if models.is_empty() {
        return Err(DispatchError::InvalidResponse {
            details: "catalog lists no models".to_string(),
        });
    }

    Ok(models)
}

/// Pick the startup rotation: configured list, then the catalog, then the
/// built-in fallback.
pub async fn resolve_models(
    config: &InferenceConfig,
    catalog: &ModelCatalog,
) -> (Vec<String>, ModelSource) {
    if !config.models.is_empty() {
        info!("Using {} configured models", config.models.len());
        return (config.models.clone(), ModelSource::Configured);
    }

    match catalog.fetch().await {
        Ok(models) => {
            info!("Using {} models from catalog: {:?}", models.len(), models);
            (models, ModelSource::Catalog)
        }
        Err(e) => {
            warn!(
                "Model catalog unavailable ({}), falling back to {:?}",
                e, config.fallback_models
            );
            (config.fallback_models.clone(), ModelSource::Fallback)
        }
    }
}
