use crate::error::ServiceResult;
use async_trait::async_trait;
use serde_json::Value;

/// Minimal get/set persistence port. Values are JSON documents; a missing
/// key is `Ok(None)`, never an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> ServiceResult<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> ServiceResult<()>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> ServiceResult<bool>;

    async fn health_check(&self) -> ServiceResult<bool>;
}
