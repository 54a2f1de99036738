use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Twitter API error: {0}")]
    TwitterApi(#[from] TwitterApiError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not identify the authenticated account: {0}")]
    Identity(Box<CoreError>),

    #[error("Search failed: {0}")]
    Fetch(Box<CoreError>),

    #[error("Reply to post {post_id} failed: {source}")]
    Send {
        post_id: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone)]
pub enum TwitterApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Invalid OAuth token")]
    InvalidToken,

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Request rejected with status {status_code}: {details}")]
    Rejected { status_code: u16, details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Migration failed: {migration}")]
    MigrationFailed { migration: String },

    #[error("Store not connected")]
    NotConnected,

    #[error("Database locked")]
    DatabaseLocked,

    #[error("Corrupt value under {key}: {value}")]
    CorruptValue { key: String, value: String },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration format: {details}")]
    InvalidFormat { details: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Permission denied accessing config: {path}")]
    PermissionDenied { path: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
