use crate::error::ConfigError;
use crate::types::{RunConfig, MAX_TWEET_COUNT};
use serde::Deserialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_KEY_PREFIX: &str = "hashtag-responder:";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://hashtag-responder.db";
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 60;
pub const MIN_POLL_INTERVAL_SECONDS: u64 = 5;

const MAX_FETCH_COUNT_LIMIT: u32 = 100;

pub const ENV_CLIENT_ID: &str = "TWITTER_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "TWITTER_CLIENT_SECRET";
pub const ENV_ACCESS_TOKEN: &str = "TWITTER_ACCESS_TOKEN";
pub const ENV_REFRESH_TOKEN: &str = "TWITTER_REFRESH_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are read as TOML, everything else as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Credentials are opaque to the responder; only the Twitter client reads them.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(value: &Option<String>) -> &'static str {
            if value.is_some() {
                "<redacted>"
            } else {
                "<unset>"
            }
        }

        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

impl Credentials {
    /// Replace fields with values from the environment where present.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = non_empty(ENV_CLIENT_ID) {
            self.client_id = Some(value);
        }
        if let Some(value) = non_empty(ENV_CLIENT_SECRET) {
            self.client_secret = Some(value);
        }
        if let Some(value) = non_empty(ENV_ACCESS_TOKEN) {
            self.access_token = Some(value);
        }
        if let Some(value) = non_empty(ENV_REFRESH_TOKEN) {
            self.refresh_token = Some(value);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_access_token = self.access_token.is_some();
        let can_refresh = self.client_id.is_some() && self.refresh_token.is_some();

        if has_access_token || can_refresh {
            Ok(())
        } else {
            Err(ConfigError::MissingField {
                field: "credentials.accessToken".to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub search_query: String,
    #[serde(default)]
    pub exclude_screen_names: Vec<String>,
    #[serde(default)]
    pub photo_tweets_only: bool,
    #[serde(default)]
    pub reply_with: Vec<String>,
    #[serde(rename = "redisPrefix", alias = "keyPrefix", default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_max_fetch_count")]
    pub max_fetch_count: u32,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub credentials: Credentials,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_max_fetch_count() -> u32 {
    MAX_TWEET_COUNT
}

fn default_poll_interval_seconds() -> u64 {
    DEFAULT_POLL_INTERVAL_SECONDS
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

impl AppConfig {
    /// Read and parse a configuration file, then apply `TWITTER_*` environment overrides.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ConfigError::FileNotFound {
                    path: path.display().to_string(),
                },
                ErrorKind::PermissionDenied => ConfigError::PermissionDenied {
                    path: path.display().to_string(),
                },
                _ => ConfigError::InvalidFormat {
                    details: format!("{}: {}", path.display(), e),
                },
            })?;

        let mut config = Self::parse(&contents, ConfigFormat::from_path(path))?;
        config
            .credentials
            .apply_overrides(|name| std::env::var(name).ok());
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Json => {
                serde_json::from_str(contents).map_err(|e| ConfigError::InvalidFormat {
                    details: e.to_string(),
                })
            }
            ConfigFormat::Toml => Ok(toml::from_str(contents)?),
        }
    }

    /// Checks everything a run needs before the first network call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search_query.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "searchQuery".to_string(),
            });
        }

        if self.reply_with.is_empty() {
            return Err(ConfigError::MissingField {
                field: "replyWith".to_string(),
            });
        }

        if self.max_fetch_count == 0 || self.max_fetch_count > MAX_FETCH_COUNT_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "maxFetchCount".to_string(),
                value: self.max_fetch_count.to_string(),
            });
        }

        if self.poll_interval_seconds < MIN_POLL_INTERVAL_SECONDS {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "pollIntervalSeconds must be at least {}, got {}",
                    MIN_POLL_INTERVAL_SECONDS, self.poll_interval_seconds
                ),
            });
        }

        self.credentials.validate()
    }

    /// `dry_run_flag` comes from the command line and can only turn dry-run on.
    pub fn run_config(&self, dry_run_flag: bool) -> RunConfig {
        RunConfig {
            search_query: self.search_query.clone(),
            exclude_handles: self
                .exclude_screen_names
                .iter()
                .map(|handle| handle.trim_start_matches('@').to_string())
                .collect(),
            photos_only: self.photo_tweets_only,
            reply_templates: self.reply_with.clone(),
            max_fetch_count: self.max_fetch_count,
            dry_run: self.dry_run || dry_run_flag,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}
