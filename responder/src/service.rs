use crate::pipeline::{Responder, RunReport};
use responder_core::{
    ConfigError, CoreError, ErrorExt, ErrorReporter, KeyValueStore, RunConfig, SearchClient,
};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Runs the responder on a fixed interval until shut down.
pub struct ResponderService<C, S> {
    responder: Responder<C, S>,
    config: RunConfig,
    poll_interval: Duration,
    reporter: ErrorReporter,
}

impl<C: SearchClient, S: KeyValueStore> ResponderService<C, S> {
    pub fn new(responder: Responder<C, S>, config: RunConfig, poll_interval: Duration) -> Self {
        Self {
            responder,
            config,
            poll_interval,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn responder(&self) -> &Responder<C, S> {
        &self.responder
    }

    pub async fn run_once(&self) -> Result<RunReport, CoreError> {
        self.responder.run_once(&self.config).await
    }

    /// Poll until Ctrl-C.
    pub async fn run_forever(&self) -> Result<u64, CoreError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Poll until `shutdown` completes and return the number of runs started.
    ///
    /// A failed run is reported and the next tick tries again, except for
    /// configuration errors, which cannot fix themselves between ticks.
    /// Transient failures (rate limits, server errors, a busy store) are
    /// reported as warnings.
    pub async fn run_until<F: Future>(&self, shutdown: F) -> Result<u64, CoreError> {
        if self.config.reply_templates.is_empty() {
            return Err(ConfigError::MissingField {
                field: "replyWith".to_string(),
            }
            .into());
        }

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Polling every {:?}", self.poll_interval);
        let mut runs = 0u64;
        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested after {} runs", runs);
                    return Ok(runs);
                }
                _ = interval.tick() => {
                    runs += 1;
                    match self.run_once().await {
                        Ok(_) => {}
                        Err(e @ CoreError::Config(_)) => return Err(e),
                        Err(e) if e.is_retryable() => self.reporter.report_warning(&e),
                        Err(e) => self.reporter.report_error(&e),
                    }
                }
            }
        }
    }
}
