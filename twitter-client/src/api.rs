use responder_core::{CoreError, MediaItem, Post, PostId, SearchRequest, TwitterApiError};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};
use url::Url;

pub const TWITTER_API_BASE: &str = "https://api.twitter.com";

/// The recent search endpoint rejects `max_results` outside this range.
pub const SEARCH_MIN_RESULTS: u32 = 10;
pub const SEARCH_MAX_RESULTS: u32 = 100;

const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<TweetData>,
    #[serde(default)]
    pub includes: Includes,
    pub meta: Option<SearchMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetData {
    pub id: String,
    pub text: String,
    pub author_id: Option<String>,
    #[serde(default)]
    pub referenced_tweets: Vec<ReferencedTweet>,
    pub attachments: Option<Attachments>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencedTweet {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachments {
    #[serde(default)]
    pub media_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<UserData>,
    #[serde(default)]
    pub media: Vec<MediaData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaData {
    pub media_key: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMeta {
    pub newest_id: Option<String>,
    pub oldest_id: Option<String>,
    #[serde(default)]
    pub result_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub data: UserData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTweetRequest {
    pub text: String,
    pub reply: ReplyTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub in_reply_to_tweet_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTweetResponse {
    pub data: CreatedTweet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedTweet {
    pub id: String,
    pub text: String,
}

/// Problem body returned alongside 4xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
struct ApiProblem {
    title: Option<String>,
    detail: Option<String>,
}

impl SearchResponse {
    /// Resolve authors and media from `includes` and keep the API's order.
    ///
    /// Tweets whose author is missing from `includes` are dropped: without a
    /// handle the self and exclusion filters cannot be applied.
    pub fn into_posts(self) -> Result<Vec<Post>, CoreError> {
        let usernames: HashMap<&str, &str> = self
            .includes
            .users
            .iter()
            .map(|user| (user.id.as_str(), user.username.as_str()))
            .collect();
        let media_types: HashMap<&str, &str> = self
            .includes
            .media
            .iter()
            .map(|media| (media.media_key.as_str(), media.kind.as_str()))
            .collect();

        let mut posts = Vec::with_capacity(self.data.len());
        for tweet in &self.data {
            let id = PostId::parse(&tweet.id).map_err(|_| {
                CoreError::TwitterApi(TwitterApiError::InvalidResponse {
                    details: format!("tweet id '{}' is not numeric", tweet.id),
                })
            })?;

            let author = tweet
                .author_id
                .as_deref()
                .and_then(|author_id| usernames.get(author_id));
            let Some(author) = author else {
                warn!("Dropping tweet {}: author not present in response", tweet.id);
                continue;
            };

            let media = tweet
                .attachments
                .as_ref()
                .map(|attachments| {
                    attachments
                        .media_keys
                        .iter()
                        .filter_map(|key| media_types.get(key.as_str()))
                        .map(|kind| MediaItem {
                            kind: kind.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default();

            posts.push(Post {
                id,
                author_handle: author.to_string(),
                text: tweet.text.clone(),
                is_retweet: tweet
                    .referenced_tweets
                    .iter()
                    .any(|referenced| referenced.kind == "retweeted"),
                media,
            });
        }

        Ok(posts)
    }
}

/// Map a non-success status to the error taxonomy.
pub fn classify_status(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    endpoint: &str,
) -> TwitterApiError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => TwitterApiError::RateLimitExceeded {
            retry_after: rate_limit_wait(headers),
        },
        StatusCode::UNAUTHORIZED => TwitterApiError::InvalidToken,
        StatusCode::FORBIDDEN => TwitterApiError::Forbidden {
            resource: match problem_detail(body) {
                Some(detail) => format!("{} ({})", endpoint, detail),
                None => endpoint.to_string(),
            },
        },
        status if status.is_server_error() => TwitterApiError::ServerError {
            status_code: status.as_u16(),
        },
        status => TwitterApiError::Rejected {
            status_code: status.as_u16(),
            details: problem_detail(body).unwrap_or_else(|| status.to_string()),
        },
    }
}

fn problem_detail(body: &str) -> Option<String> {
    let problem: ApiProblem = serde_json::from_str(body).ok()?;
    problem.detail.or(problem.title)
}

/// Seconds until the rate-limit window resets, from `x-rate-limit-reset`
/// (epoch seconds) or `retry-after`.
fn rate_limit_wait(headers: &HeaderMap) -> u64 {
    let header_u64 = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
    };

    if let Some(reset_at) = header_u64("x-rate-limit-reset") {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        return reset_at.saturating_sub(now).max(1);
    }

    header_u64("retry-after").unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS)
}

#[derive(Debug, Clone)]
pub struct TwitterApiClient {
    http_client: Client,
    base_url: Url,
}

impl TwitterApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        let base_url = Url::parse(TWITTER_API_BASE).map_err(|e| CoreError::Internal {
            message: format!("invalid API base url: {e}"),
        })?;
        Self::with_base_url(user_agent, base_url)
    }

    pub fn with_base_url(user_agent: String, base_url: Url) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub async fn make_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        body: Option<&B>,
    ) -> Result<Response, CoreError> {
        let url = self.base_url.join(endpoint).map_err(|e| CoreError::InvalidInput {
            message: format!("invalid endpoint {endpoint}: {e}"),
        })?;

        let mut request_builder = self
            .http_client
            .request(method.clone(), url)
            .bearer_auth(access_token);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }
        if let Some(body) = body {
            request_builder = request_builder.json(body);
        }

        debug!("Making Twitter API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::TwitterApi(TwitterApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        let api_error = classify_status(status, &headers, &body, endpoint);
        error!(
            "Request failed with status {} for {}: {}",
            status, endpoint, api_error
        );
        Err(CoreError::TwitterApi(api_error))
    }

    pub async fn search_recent(
        &self,
        access_token: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, CoreError> {
        let max_results = request
            .count
            .clamp(SEARCH_MIN_RESULTS, SEARCH_MAX_RESULTS)
            .to_string();

        let mut params = vec![
            ("query", request.query.as_str()),
            ("max_results", max_results.as_str()),
            ("expansions", "author_id,attachments.media_keys"),
            ("tweet.fields", "author_id,referenced_tweets,attachments"),
            ("user.fields", "username"),
            ("media.fields", "type"),
        ];
        if let Some(since_id) = &request.since_id {
            params.push(("since_id", since_id.as_str()));
        }

        let response = self
            .make_request::<()>(
                Method::GET,
                "/2/tweets/search/recent",
                access_token,
                Some(params.as_slice()),
                None,
            )
            .await?;

        let search: SearchResponse = response.json().await.map_err(|e| {
            error!("Failed to parse search results: {}", e);
            CoreError::TwitterApi(TwitterApiError::InvalidResponse {
                details: format!("Failed to parse search results for '{}'", request.query),
            })
        })?;

        info!(
            "Search '{}' returned {} tweets",
            request.query,
            search.data.len()
        );
        Ok(search)
    }

    pub async fn get_me(&self, access_token: &str) -> Result<UserData, CoreError> {
        let response = self
            .make_request::<()>(Method::GET, "/2/users/me", access_token, None, None)
            .await?;

        let user: UserResponse = response.json().await.map_err(|e| {
            error!("Failed to parse user data: {}", e);
            CoreError::TwitterApi(TwitterApiError::InvalidResponse {
                details: "Failed to parse user data".to_string(),
            })
        })?;

        debug!("Authenticated as @{}", user.data.username);
        Ok(user.data)
    }

    pub async fn create_reply(
        &self,
        access_token: &str,
        text: &str,
        in_reply_to: &PostId,
    ) -> Result<CreatedTweet, CoreError> {
        let request = CreateTweetRequest {
            text: text.to_string(),
            reply: ReplyTarget {
                in_reply_to_tweet_id: in_reply_to.to_string(),
            },
        };

        let response = self
            .make_request(Method::POST, "/2/tweets", access_token, None, Some(&request))
            .await?;

        let created: CreateTweetResponse = response.json().await.map_err(|e| {
            error!("Failed to parse created tweet: {}", e);
            CoreError::TwitterApi(TwitterApiError::InvalidResponse {
                details: "Failed to parse created tweet".to_string(),
            })
        })?;

        info!("Posted reply {} to {}", created.data.id, in_reply_to);
        Ok(created.data)
    }
}
