use crate::{
    config::UpstashConfig,
    error::{ServiceError, ServiceResult},
    storage::traits::KeyValueStore,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

/// Upstash Redis over its REST interface. Every command is a JSON array
/// posted to the database root, e.g. `["SET", key, value]`.
pub struct UpstashStore {
    client: Client,
    base_url: String,
    token: String,
}

impl UpstashStore {
    pub async fn new(config: UpstashConfig) -> ServiceResult<Self> {
        let base_url = config
            .url
            .ok_or_else(|| ServiceError::ConfigError("Upstash URL is required".into()))?;

        let token = config
            .token
            .ok_or_else(|| ServiceError::ConfigError("Upstash token is required".into()))?;

        let store = Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        };

        if !store.health_check().await? {
            return Err(ServiceError::StorageError(
                "Upstash did not answer PING".into(),
            ));
        }
        log::info!("🗄️  Connected to Upstash at {}", store.base_url);

        Ok(store)
    }

    async fn command(&self, command: Value) -> ServiceResult<Value> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&command)
            .send()
            .await
            .map_err(|e| ServiceError::RequestError(format!("Upstash request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::RateLimited("Upstash rate limit reached".into()));
        }

        let body: Value = response.json().await.map_err(|e| {
            ServiceError::ResponseError(format!("Failed to parse Upstash response: {}", e))
        })?;

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            return Err(ServiceError::StorageError(format!(
                "Upstash command failed ({}): {}",
                status, error
            )));
        }
        if !status.is_success() {
            return Err(ServiceError::StorageError(format!(
                "Upstash command failed: {}",
                status
            )));
        }

        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl KeyValueStore for UpstashStore {
    async fn get(&self, key: &str) -> ServiceResult<Option<Value>> {
        match self.command(json!(["GET", key])).await? {
            Value::Null => Ok(None),
            Value::String(stored) => serde_json::from_str(&stored).map(Some).map_err(|e| {
                ServiceError::SerializationError(format!(
                    "value under '{}' is not JSON: {}",
                    key, e
                ))
            }),
            other => Err(ServiceError::ResponseError(format!(
                "unexpected GET result for '{}': {}",
                key, other
            ))),
        }
    }

    async fn set(&self, key: &str, value: Value) -> ServiceResult<()> {
        let serialized = serde_json::to_string(&value)
            .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
        self.command(json!(["SET", key, serialized])).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> ServiceResult<bool> {
        let removed = self.command(json!(["DEL", key])).await?;
        Ok(removed.as_u64().unwrap_or(0) > 0)
    }

    async fn health_check(&self) -> ServiceResult<bool> {
        let pong = self.command(json!(["PING"])).await?;
        Ok(pong.as_str() == Some("PONG"))
    }
}
