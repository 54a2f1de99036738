use responder_core::{CoreError, TwitterApiError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Waits are capped at a minute; longer outages are left to the next run.
    pub fn twitter() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            max_delay_ms: 60000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }

    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Retry with exponential backoff
    Retry,
    /// Retry after the delay the server asked for
    RetryWithDelay(Duration),
    /// Permanent failure
    NoRetry,
}

pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    match error {
        CoreError::TwitterApi(twitter_error) => match twitter_error {
            TwitterApiError::RateLimitExceeded { retry_after } => {
                RetryStrategy::RetryWithDelay(Duration::from_secs(*retry_after))
            }
            TwitterApiError::ServerError { .. } => RetryStrategy::Retry,
            TwitterApiError::RequestTimeout => RetryStrategy::Retry,
            TwitterApiError::AuthenticationFailed { .. }
            | TwitterApiError::InvalidToken
            | TwitterApiError::Forbidden { .. }
            | TwitterApiError::InvalidResponse { .. }
            | TwitterApiError::Rejected { .. } => RetryStrategy::NoRetry,
        },
        CoreError::Network(reqwest_error) => {
            if reqwest_error.is_timeout() || reqwest_error.is_connect() {
                RetryStrategy::Retry
            } else {
                RetryStrategy::NoRetry
            }
        }
        _ => RetryStrategy::NoRetry,
    }
}

/// Calculate delay with exponential backoff and jitter
pub fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let max_delay = Duration::from_millis(config.max_delay_ms);

    let multiplier = config.backoff_multiplier.powi(attempt as i32);
    let delay_ms = (config.base_delay_ms as f64 * multiplier) as u64;
    let exponential_delay = Duration::from_millis(delay_ms.min(config.max_delay_ms));

    let jitter_range = (exponential_delay.as_millis() as f64 * config.jitter_factor) as u64;
    let jitter = fastrand::u64(0..=jitter_range);

    (exponential_delay + Duration::from_millis(jitter)).min(max_delay)
}

/// Runs idempotent requests with retry. Writes must not go through here.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the last error unchanged once attempts run out.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!("{} succeeded after {} retries", operation_name, attempt);
                    }
                    return Ok(result);
                }
                Err(error) => {
                    let has_attempts_left = attempt + 1 < self.config.max_attempts;

                    let delay = match get_retry_strategy(&error) {
                        RetryStrategy::Retry if has_attempts_left => {
                            calculate_delay(attempt, &self.config)
                        }
                        RetryStrategy::RetryWithDelay(delay) if has_attempts_left => {
                            delay.min(Duration::from_millis(self.config.max_delay_ms))
                        }
                        RetryStrategy::NoRetry => {
                            debug!("Not retrying {}: {}", operation_name, error);
                            return Err(error);
                        }
                        _ => {
                            warn!(
                                "{} failed after {} attempts: {}",
                                operation_name,
                                attempt + 1,
                                error
                            );
                            return Err(error);
                        }
                    };

                    info!("Retrying {} in {:?} due to: {}", operation_name, delay, error);
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_retry_config_twitter() {
        let config = RetryConfig::twitter();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay_ms, 2000);
        assert_eq!(config.jitter_factor, 0.2);
        assert_eq!(RetryConfig::disabled().max_attempts, 1);
    }

    #[test]
    fn test_retry_strategy_for_errors() {
        let rate_limit_error =
            CoreError::TwitterApi(TwitterApiError::RateLimitExceeded { retry_after: 60 });
        assert_eq!(
            get_retry_strategy(&rate_limit_error),
            RetryStrategy::RetryWithDelay(Duration::from_secs(60))
        );

        let auth_error = CoreError::TwitterApi(TwitterApiError::InvalidToken);
        assert_eq!(get_retry_strategy(&auth_error), RetryStrategy::NoRetry);

        let server_error = CoreError::TwitterApi(TwitterApiError::ServerError { status_code: 503 });
        assert_eq!(get_retry_strategy(&server_error), RetryStrategy::Retry);

        let store_error = CoreError::Internal {
            message: "boom".to_string(),
        };
        assert_eq!(get_retry_strategy(&store_error), RetryStrategy::NoRetry);
    }

    #[test]
    fn test_exponential_backoff_calculation() {
        let config = RetryConfig {
            base_delay_ms: 1000,
            max_delay_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
            ..Default::default()
        };

        assert_eq!(calculate_delay(0, &config), Duration::from_millis(1000));
        assert_eq!(calculate_delay(1, &config), Duration::from_millis(2000));
        assert_eq!(calculate_delay(3, &config), Duration::from_millis(8000));
        assert_eq!(calculate_delay(10, &config), Duration::from_millis(10000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let config = RetryConfig {
            base_delay_ms: 1000,
            max_delay_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.5,
            ..Default::default()
        };

        for _ in 0..20 {
            let delay = calculate_delay(1, &config);
            assert!(delay >= Duration::from_millis(2000));
            assert!(delay <= Duration::from_millis(3000));
        }
    }

    #[tokio::test]
    async fn test_executor_retries_server_errors() {
        let executor = RetryExecutor::new(RetryConfig {
            base_delay_ms: 1,
            max_delay_ms: 5,
            ..Default::default()
        });
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result = executor
            .execute("search", move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(CoreError::TwitterApi(TwitterApiError::ServerError {
                            status_code: 500,
                        }))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_executor_keeps_original_error() {
        let executor = RetryExecutor::new(RetryConfig::default());
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result: Result<i32, CoreError> = executor
            .execute("verify", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(CoreError::TwitterApi(TwitterApiError::InvalidToken))
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(CoreError::TwitterApi(TwitterApiError::InvalidToken))
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_executor_gives_up_after_max_attempts() {
        let executor = RetryExecutor::new(RetryConfig {
            max_attempts: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
            ..Default::default()
        });
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result: Result<i32, CoreError> = executor
            .execute("search", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(CoreError::TwitterApi(TwitterApiError::RequestTimeout))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
