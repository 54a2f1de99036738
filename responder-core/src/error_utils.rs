use crate::error::*;
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::TwitterApi(e) => {
                error!("Twitter API error details: {:?}", e);
            }
            CoreError::Store(e) => {
                error!("Store error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            CoreError::Identity(e) | CoreError::Fetch(e) => {
                error!("Caused by: {:?}", e);
            }
            CoreError::Send { source, .. } => {
                error!("Caused by: {:?}", source);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        match self {
            CoreError::TwitterApi(e) => {
                e.log_warn();
            }
            CoreError::Store(e) => {
                e.log_warn();
            }
            CoreError::Config(e) => {
                e.log_warn();
            }
            CoreError::Identity(e) | CoreError::Fetch(e) => {
                e.log_warn();
            }
            _ => {}
        }
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::TwitterApi(e) => e.is_retryable(),
            CoreError::Store(e) => e.is_retryable(),
            CoreError::Identity(e) | CoreError::Fetch(e) => e.is_retryable(),
            // The post is already recorded; retrying would risk a duplicate reply
            CoreError::Send { .. } => false,
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::TwitterApi(e) => e.retry_after(),
            CoreError::Identity(e) | CoreError::Fetch(e) => e.retry_after(),
            _ if self.is_retryable() => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::TwitterApi(e) => e.user_friendly_message(),
            CoreError::Store(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Identity(_) => {
                "Could not confirm which account is signed in. Check the access token.".to_string()
            }
            CoreError::Fetch(e) => format!("Search failed: {}", e.user_friendly_message()),
            CoreError::Send { post_id, .. } => format!(
                "Reply to post {} was not delivered and will not be retried.",
                post_id
            ),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { .. } => {
                "Invalid input provided. Please check your input and try again.".to_string()
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::TwitterApi(_) => "TWITTER_API".to_string(),
            CoreError::Store(_) => "STORE".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Identity(_) => "AUTH".to_string(),
            CoreError::Fetch(_) => "FETCH".to_string(),
            CoreError::Send { .. } => "SEND".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for TwitterApiError {
    fn log_error(&self) -> &Self {
        error!("TwitterApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("TwitterApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            TwitterApiError::RateLimitExceeded { .. } => true,
            TwitterApiError::RequestTimeout => true,
            TwitterApiError::ServerError { status_code } => *status_code >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            TwitterApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ if self.is_retryable() => Some(Duration::from_secs(30)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            TwitterApiError::AuthenticationFailed { .. } => {
                "Twitter authentication failed. Please check your credentials.".to_string()
            }
            TwitterApiError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            TwitterApiError::Forbidden { resource } => format!(
                "Access denied to {}. The app may lack the required scopes.",
                resource
            ),
            TwitterApiError::InvalidToken => {
                "Twitter access token is invalid. Please re-authenticate.".to_string()
            }
            TwitterApiError::RequestTimeout => {
                "Request to Twitter timed out. Please try again.".to_string()
            }
            TwitterApiError::Rejected { details, .. } => {
                format!("Twitter rejected the request: {}", details)
            }
            _ => "Twitter API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            TwitterApiError::AuthenticationFailed { .. } => "TWITTER_AUTH_FAILED".to_string(),
            TwitterApiError::RateLimitExceeded { .. } => "TWITTER_RATE_LIMIT".to_string(),
            TwitterApiError::Forbidden { .. } => "TWITTER_FORBIDDEN".to_string(),
            TwitterApiError::InvalidToken => "TWITTER_INVALID_TOKEN".to_string(),
            TwitterApiError::RequestTimeout => "TWITTER_TIMEOUT".to_string(),
            TwitterApiError::InvalidResponse { .. } => "TWITTER_INVALID_RESPONSE".to_string(),
            TwitterApiError::Rejected { .. } => "TWITTER_REJECTED".to_string(),
            TwitterApiError::ServerError { .. } => "TWITTER_SERVER_ERROR".to_string(),
        }
    }
}

impl ErrorExt for StoreError {
    fn log_error(&self) -> &Self {
        error!("StoreError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("StoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::DatabaseLocked
                | StoreError::ConnectionFailed { .. }
                | StoreError::Unavailable { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            StoreError::DatabaseLocked => Some(Duration::from_millis(100)),
            _ if self.is_retryable() => Some(Duration::from_secs(1)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StoreError::ConnectionFailed { .. } | StoreError::NotConnected => {
                "Could not reach the state store. Please try again.".to_string()
            }
            StoreError::DatabaseLocked => {
                "State store is temporarily busy. Please try again.".to_string()
            }
            StoreError::CorruptValue { key, .. } => format!(
                "Stored value under '{}' is unreadable. Fix or delete it before the next run.",
                key
            ),
            _ => "State store error occurred. Please try again.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            StoreError::ConnectionFailed { .. } => "STORE_CONNECTION_FAILED".to_string(),
            StoreError::MigrationFailed { .. } => "STORE_MIGRATION_FAILED".to_string(),
            StoreError::NotConnected => "STORE_NOT_CONNECTED".to_string(),
            StoreError::DatabaseLocked => "STORE_LOCKED".to_string(),
            StoreError::CorruptValue { .. } => "STORE_CORRUPT_VALUE".to_string(),
            StoreError::Unavailable { .. } => "STORE_UNAVAILABLE".to_string(),
            StoreError::Sql(_) => "STORE_SQL_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::InvalidFormat { .. } | ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::PermissionDenied { .. } => {
                "Permission denied accessing configuration. Please check file permissions."
                    .to_string()
            }
            _ => "Configuration error occurred. Please check your settings.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidFormat { .. } => "CONFIG_INVALID_FORMAT".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::PermissionDenied { .. } => "CONFIG_PERMISSION_DENIED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Logs errors with their code and user-facing message.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!("Error code: {}", error.error_code());
        info!("User message: {}", error.user_friendly_message());
        if error.is_retryable() {
            if let Some(retry_after) = error.retry_after() {
                info!("Error is retryable. Retry after: {:?}", retry_after);
            }
        }
    }

    /// For failures that are expected to clear up on their own.
    pub fn report_warning(&self, error: &CoreError) {
        error.log_warn();
        info!("Error code: {}", error.error_code());
    }
}
