pub mod api;
pub mod auth;
pub mod retry;


use api::TwitterApiClient;
use auth::TwitterAuth;
use responder_core::{CoreError, Credentials, Post, PostId, SearchClient, SearchRequest};
use retry::{RetryConfig, RetryExecutor};
use tracing::{debug, info};

pub const DEFAULT_USER_AGENT: &str = concat!("hashtag-responder/", env!("CARGO_PKG_VERSION"));

/// Twitter API v2 implementation of [`SearchClient`].
///
/// Searches and identity lookups are retried on transient failures. Replies
/// are sent exactly once: a retried POST could publish the same reply twice.
#[derive(Debug)]
pub struct TwitterClient {
    api: TwitterApiClient,
    auth: TwitterAuth,
    retry: RetryExecutor,
}

impl TwitterClient {
    pub fn new(credentials: &Credentials) -> Result<Self, CoreError> {
        let api = TwitterApiClient::new(DEFAULT_USER_AGENT.to_string())?;
        Self::with_api(api, credentials, RetryConfig::twitter())
    }

    pub fn with_api(
        api: TwitterApiClient,
        credentials: &Credentials,
        retry_config: RetryConfig,
    ) -> Result<Self, CoreError> {
        let auth = TwitterAuth::from_credentials(credentials)?;
        if auth.uses_refresh() {
            info!("Using OAuth2 refresh token for API access");
        } else {
            info!("Using configured access token for API access");
        }

        Ok(Self {
            api,
            auth,
            retry: RetryExecutor::new(retry_config),
        })
    }
}

impl SearchClient for TwitterClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Post>, CoreError> {
        let access_token = self.auth.access_token().await?;
        let response = self
            .retry
            .execute("search", || self.api.search_recent(&access_token, request))
            .await?;

        let mut posts = response.into_posts()?;
        // The endpoint has a minimum page size; honor the smaller requested count
        posts.truncate(request.count as usize);
        debug!("Search produced {} posts", posts.len());
        Ok(posts)
    }

    async fn verify_identity(&self) -> Result<String, CoreError> {
        let access_token = self.auth.access_token().await?;
        let user = self
            .retry
            .execute("verify_identity", || self.api.get_me(&access_token))
            .await?;
        Ok(user.username)
    }

    async fn reply(&self, text: &str, in_reply_to: &PostId) -> Result<(), CoreError> {
        let access_token = self.auth.access_token().await?;
        self.api
            .create_reply(&access_token, text, in_reply_to)
            .await?;
        Ok(())
    }
}
