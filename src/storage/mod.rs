pub mod memory;
pub mod traits;
#[cfg(feature = "upstash")]
pub mod upstash;

use crate::config::Config;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{HistoryBuffer, SavedAsset};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use traits::KeyValueStore;
#[cfg(feature = "upstash")]
pub use upstash::UpstashStore;

pub const QUOTE_HISTORY_KEY: &str = "mantraQuoteHistory";
pub const AUTHOR_HISTORY_KEY: &str = "mantraAuthorHistory";
pub const SAVED_ASSETS_KEY: &str = "mantraSavedAssets";

/// History and saved assets kept under fixed keys of a [`KeyValueStore`].
///
/// Corrupt or missing values load as empty; the store is advisory state and
/// never blocks a generation run.
#[derive(Clone)]
pub struct HistoryStore {
    backend: Arc<dyn KeyValueStore>,
}

impl HistoryStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Upstash when configured and compiled in, memory otherwise.
    pub async fn from_config(config: &Config) -> ServiceResult<Self> {
        match &config.upstash {
            Some(upstash) => {
                #[cfg(feature = "upstash")]
                {
                    Ok(Self::new(Arc::new(UpstashStore::new(upstash.clone()).await?)))
                }
                #[cfg(not(feature = "upstash"))]
                {
                    let _ = upstash;
                    log::warn!("Upstash credentials set but the upstash feature is off; history lives in memory");
                    Ok(Self::in_memory())
                }
            }
            None => {
                log::info!("🗄️  No persistent store configured; history lives in memory");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    pub async fn load_history(&self) -> ServiceResult<HistoryBuffer> {
        let quotes: Vec<String> = self.load_or_default(QUOTE_HISTORY_KEY).await?;
        let authors: Vec<String> = self.load_or_default(AUTHOR_HISTORY_KEY).await?;

        let mut history = HistoryBuffer::new();
        for quote in quotes {
            history.remember_quote(quote);
        }
        // Stored most recent first; replay oldest first to keep that order.
        for author in authors.into_iter().rev() {
            history.remember_author(author);
        }
        Ok(history)
    }

    pub async fn save_history(&self, history: &HistoryBuffer) -> ServiceResult<()> {
        self.store(QUOTE_HISTORY_KEY, &history.seen_quotes).await?;
        self.store(AUTHOR_HISTORY_KEY, &history.recent_authors).await
    }

    /// Most recent first.
    pub async fn saved_assets(&self) -> ServiceResult<Vec<SavedAsset>> {
        self.load_or_default(SAVED_ASSETS_KEY).await
    }

    pub async fn save_asset(&self, asset: SavedAsset) -> ServiceResult<()> {
        let mut assets = self.saved_assets().await?;
        assets.retain(|existing| existing.id != asset.id);
        assets.insert(0, asset);
        self.store(SAVED_ASSETS_KEY, &assets).await
    }

    pub async fn delete_asset(&self, id: &str) -> ServiceResult<bool> {
        let mut assets = self.saved_assets().await?;
        let before = assets.len();
        assets.retain(|asset| asset.id != id);
        if assets.len() == before {
            return Ok(false);
        }
        self.store(SAVED_ASSETS_KEY, &assets).await?;
        Ok(true)
    }

    async fn load_or_default<T>(&self, key: &str) -> ServiceResult<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.backend.get(key).await? {
            None => Ok(T::default()),
            Some(value) => Ok(serde_json::from_value(value).unwrap_or_else(|e| {
                log::warn!("Discarding unreadable value under '{}': {}", key, e);
                T::default()
            })),
        }
    }

    async fn store<T: serde::Serialize>(&self, key: &str, value: &T) -> ServiceResult<()> {
        let value: Value = serde_json::to_value(value)
            .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
        self.backend.set(key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetSpec, GeneratedImage, Metadata, QuoteBlock};
    use serde_json::json;

    fn spec(quote: &str, author: &str) -> AssetSpec {
        AssetSpec {
            quote: QuoteBlock { text: quote.into() },
            metadata: Metadata {
                author: author.into(),
                source: String::new(),
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn history_round_trips_through_the_store() {
        let store = HistoryStore::in_memory();
        let mut history = HistoryBuffer::new();
        history.record(&spec("Stay hungry.", "Steve Jobs"));
        history.record(&spec("Begin.", "Plato"));
        store.save_history(&history).await.unwrap();

        let loaded = store.load_history().await.unwrap();
        assert_eq!(loaded, history);
        assert_eq!(loaded.recent_authors, vec!["Plato", "Steve Jobs"]);
    }

    #[tokio::test]
    async fn corrupt_history_loads_empty() {
        let store = HistoryStore::in_memory();
        store
            .backend()
            .set(QUOTE_HISTORY_KEY, json!({"not": "a list"}))
            .await
            .unwrap();
        let loaded = store.load_history().await.unwrap();
        assert!(loaded.seen_quotes.is_empty());
    }

    #[tokio::test]
    async fn saved_assets_newest_first_and_deletable() {
        let store = HistoryStore::in_memory();
        let image = GeneratedImage::new(vec![1, 2, 3]);
        let first = SavedAsset::new(&spec("One.", "A"), &image, String::new());
        let second = SavedAsset::new(&spec("Two.", "B"), &image, String::new());
        let first_id = first.id.clone();

        store.save_asset(first).await.unwrap();
        store.save_asset(second).await.unwrap();
        let assets = store.saved_assets().await.unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].spec.quote_text(), "Two.");

        assert!(store.delete_asset(&first_id).await.unwrap());
        assert!(!store.delete_asset(&first_id).await.unwrap());
        assert_eq!(store.saved_assets().await.unwrap().len(), 1);
    }
}
