use crate::error::CoreError;
use crate::types::{Post, PostId, SearchRequest};

/// Search, identity and reply operations of the social network.
pub trait SearchClient {
    /// One page of matching posts in the order the API returns them.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Post>, CoreError>;

    /// Handle of the account the credentials belong to, without a leading `@`.
    async fn verify_identity(&self) -> Result<String, CoreError>;

    async fn reply(&self, text: &str, in_reply_to: &PostId) -> Result<(), CoreError>;
}

/// Flat string key-value store holding the watermark and dedup records.
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;

    /// Writes only when `key` is absent. Returns `true` if this call created the entry.
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, CoreError>;
}
