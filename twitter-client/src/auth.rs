use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{AuthType, AuthUrl, ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use responder_core::{ConfigError, CoreError, Credentials, TwitterApiError};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const TWITTER_AUTH_URL: &str = "https://twitter.com/i/oauth2/authorize";
const TWITTER_TOKEN_URL: &str = "https://api.twitter.com/2/oauth2/token";

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() + EXPIRY_MARGIN < expires_at,
            None => true,
        }
    }
}

/// Supplies the user-context bearer token for API calls.
///
/// With a client id and refresh token the access token is obtained from the
/// OAuth2 token endpoint on first use and again whenever it is about to expire.
/// Otherwise the configured access token is used as-is.
#[derive(Debug)]
pub struct TwitterAuth {
    oauth_client: Option<BasicClient>,
    refresh_token: Mutex<Option<RefreshToken>>,
    token: Mutex<Option<CachedToken>>,
}

impl TwitterAuth {
    pub fn from_credentials(credentials: &Credentials) -> Result<Self, CoreError> {
        credentials.validate()?;

        let oauth_client = match (&credentials.client_id, &credentials.refresh_token) {
            (Some(client_id), Some(_)) => Some(build_oauth_client(
                client_id,
                credentials.client_secret.as_deref(),
            )?),
            _ => None,
        };

        let static_token = match &oauth_client {
            Some(_) => None,
            None => credentials.access_token.clone().map(|access_token| CachedToken {
                access_token,
                expires_at: None,
            }),
        };

        Ok(Self {
            oauth_client,
            refresh_token: Mutex::new(credentials.refresh_token.clone().map(RefreshToken::new)),
            token: Mutex::new(static_token),
        })
    }

    pub fn uses_refresh(&self) -> bool {
        self.oauth_client.is_some()
    }

    pub async fn access_token(&self) -> Result<String, CoreError> {
        let mut token = self.token.lock().await;
        if let Some(cached) = token.as_ref().filter(|cached| cached.is_fresh()) {
            return Ok(cached.access_token.clone());
        }

        let refreshed = self.refresh().await?;
        let access_token = refreshed.access_token.clone();
        *token = Some(refreshed);
        Ok(access_token)
    }

    async fn refresh(&self) -> Result<CachedToken, CoreError> {
        let Some(oauth_client) = &self.oauth_client else {
            return Err(CoreError::TwitterApi(TwitterApiError::InvalidToken));
        };

        let mut refresh_token = self.refresh_token.lock().await;
        let Some(current) = refresh_token.as_ref() else {
            return Err(CoreError::TwitterApi(TwitterApiError::AuthenticationFailed {
                reason: "no refresh token available".to_string(),
            }));
        };

        debug!("Exchanging refresh token for a new access token");
        let response = oauth_client
            .exchange_refresh_token(current)
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                CoreError::TwitterApi(TwitterApiError::AuthenticationFailed {
                    reason: e.to_string(),
                })
            })?;

        // Twitter refresh tokens are single use; keep the rotated one for the next refresh
        if let Some(rotated) = response.refresh_token() {
            *refresh_token = Some(rotated.clone());
            warn!("Refresh token rotated; the new token lives only in this process");
        }

        info!("Obtained access token via OAuth2 refresh");
        Ok(CachedToken {
            access_token: response.access_token().secret().clone(),
            expires_at: response
                .expires_in()
                .map(|expires_in| Instant::now() + expires_in),
        })
    }
}

fn build_oauth_client(client_id: &str, client_secret: Option<&str>) -> Result<BasicClient, CoreError> {
    let auth_url = AuthUrl::new(TWITTER_AUTH_URL.to_string()).map_err(|e| ConfigError::InvalidValue {
        field: "authUrl".to_string(),
        value: e.to_string(),
    })?;
    let token_url =
        TokenUrl::new(TWITTER_TOKEN_URL.to_string()).map_err(|e| ConfigError::InvalidValue {
            field: "tokenUrl".to_string(),
            value: e.to_string(),
        })?;

    let client = BasicClient::new(
        ClientId::new(client_id.to_string()),
        client_secret.map(|secret| ClientSecret::new(secret.to_string())),
        auth_url,
        Some(token_url),
    );

    // Public clients identify themselves in the request body instead of basic auth
    Ok(match client_secret {
        Some(_) => client,
        None => client.set_auth_type(AuthType::RequestBody),
    })
}
