use responder_core::{CoreError, KeyValueStore, PostId, StoreError};
use tracing::debug;

pub const WATERMARK_SUFFIX: &str = "LastId";

/// Highest processed post id, stored under `<prefix>LastId`.
pub struct WatermarkStore<'a, S> {
    store: &'a S,
    key: String,
}

impl<'a, S: KeyValueStore> WatermarkStore<'a, S> {
    pub fn new(store: &'a S, prefix: &str) -> Self {
        Self {
            store,
            key: format!("{prefix}{WATERMARK_SUFFIX}"),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn load(&self) -> Result<Option<PostId>, CoreError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(None);
        };

        PostId::parse(&raw).map(Some).map_err(|_| {
            CoreError::Store(StoreError::CorruptValue {
                key: self.key.clone(),
                value: raw,
            })
        })
    }

    pub async fn store(&self, id: &PostId) -> Result<(), CoreError> {
        debug!("Writing watermark {} = {}", self.key, id);
        self.store.set(&self.key, id.as_str()).await
    }
}

/// Reply text already sent per post id, stored under `<prefix><postId>`.
pub struct DedupStore<'a, S> {
    store: &'a S,
    prefix: String,
}

impl<'a, S: KeyValueStore> DedupStore<'a, S> {
    pub fn new(store: &'a S, prefix: &str) -> Self {
        Self {
            store,
            prefix: prefix.to_string(),
        }
    }

    pub fn key_for(&self, id: &PostId) -> String {
        format!("{}{}", self.prefix, id)
    }

    pub async fn lookup(&self, id: &PostId) -> Result<Option<String>, CoreError> {
        self.store.get(&self.key_for(id)).await
    }

    /// Returns `false` when another writer recorded this post first.
    pub async fn record(&self, id: &PostId, reply_text: &str) -> Result<bool, CoreError> {
        self.store.set_if_absent(&self.key_for(id), reply_text).await
    }
}
