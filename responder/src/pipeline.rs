//! One pass of the responder: watermark, identity, search, filter, dedup,
//! reply, watermark.
//!
//! Posts are handled one at a time in the order the search returned them.
//! The dedup record is written before the reply goes out, so a reply that
//! fails to send is not attempted again by a later run. The watermark is
//! only written after every kept post was handled, and only if it moves
//! forward.

use crate::filter::{decide, Decision};
use crate::selector::select;
use crate::stores::{DedupStore, WatermarkStore};
use responder_core::{
    ConfigError, CoreError, ErrorReporter, KeyValueStore, Post, PostId, RunConfig, SearchClient,
    SearchRequest,
};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub skipped: usize,
    pub already_responded: usize,
    pub replied: usize,
    /// Replies recorded but not sent because of dry-run.
    pub rehearsed: usize,
    pub send_failures: usize,
    /// Watermark after the run.
    pub watermark: Option<PostId>,
}

impl RunReport {
    pub fn kept(&self) -> usize {
        self.already_responded + self.replied + self.rehearsed + self.send_failures
    }
}

/// State that lives exactly as long as one run.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub self_handle: String,
    pub starting_watermark: Option<PostId>,
    pub max_seen: Option<PostId>,
    pub report: RunReport,
}

impl RunContext {
    pub fn new(run_id: Uuid, self_handle: String, starting_watermark: Option<PostId>) -> Self {
        Self {
            run_id,
            self_handle,
            report: RunReport {
                watermark: starting_watermark.clone(),
                ..RunReport::default()
            },
            starting_watermark,
            max_seen: None,
        }
    }

    /// `since_id` for the search; a zero watermark means "from the beginning".
    pub fn since_id(&self) -> Option<PostId> {
        self.starting_watermark
            .clone()
            .filter(|watermark| !watermark.is_zero())
    }

    pub fn observe_kept(&mut self, id: &PostId) {
        if self.max_seen.as_ref().map_or(true, |max| id > max) {
            self.max_seen = Some(id.clone());
        }
    }

    /// The id to persist, if this run moved past the starting watermark.
    pub fn advanced_watermark(&self) -> Option<&PostId> {
        let max_seen = self.max_seen.as_ref()?;
        match &self.starting_watermark {
            Some(start) if max_seen <= start => None,
            _ => Some(max_seen),
        }
    }
}

pub struct Responder<C, S> {
    client: C,
    store: S,
    key_prefix: String,
    reporter: ErrorReporter,
}

impl<C: SearchClient, S: KeyValueStore> Responder<C, S> {
    pub fn new(client: C, store: S, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            store,
            key_prefix: key_prefix.into(),
            reporter: ErrorReporter::new(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub async fn run_once(&self, config: &RunConfig) -> Result<RunReport, CoreError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, dry_run = config.dry_run);
        self.run_steps(run_id, config).instrument(span).await
    }

    async fn run_steps(&self, run_id: Uuid, config: &RunConfig) -> Result<RunReport, CoreError> {
        if config.reply_templates.is_empty() {
            return Err(ConfigError::MissingField {
                field: "replyWith".to_string(),
            }
            .into());
        }

        let watermarks = WatermarkStore::new(&self.store, &self.key_prefix);
        let dedup = DedupStore::new(&self.store, &self.key_prefix);

        let watermark = watermarks.load().await?;
        if watermark.is_none() {
            warn!(
                "No watermark under {}; searching without since_id",
                watermarks.key()
            );
        }

        let self_handle = self
            .client
            .verify_identity()
            .await
            .map_err(|e| CoreError::Identity(Box::new(e)))?;
        debug!("Running as @{}", self_handle);

        let mut ctx = RunContext::new(run_id, self_handle, watermark);

        let request = SearchRequest {
            query: config.search_query.clone(),
            since_id: ctx.since_id(),
            count: config.max_fetch_count,
        };
        let posts = self
            .client
            .search(&request)
            .await
            .map_err(|e| CoreError::Fetch(Box::new(e)))?;
        ctx.report.fetched = posts.len();

        for post in &posts {
            self.process_post(&mut ctx, &dedup, config, post).await?;
        }

        if let Some(advanced) = ctx.advanced_watermark().cloned() {
            watermarks.store(&advanced).await?;
            info!("Watermark advanced to {}", advanced);
            ctx.report.watermark = Some(advanced);
        } else {
            debug!("Watermark unchanged");
        }

        let report = ctx.report;
        info!(
            "Run complete: fetched={} skipped={} replied={} rehearsed={} already_responded={} send_failures={}",
            report.fetched,
            report.skipped,
            report.replied,
            report.rehearsed,
            report.already_responded,
            report.send_failures
        );
        Ok(report)
    }

    async fn process_post(
        &self,
        ctx: &mut RunContext,
        dedup: &DedupStore<'_, S>,
        config: &RunConfig,
        post: &Post,
    ) -> Result<(), CoreError> {
        if let Decision::Skip(reason) = decide(post, config, &ctx.self_handle) {
            debug!(post_id = %post.id, author = %post.author_handle, %reason, "Skipping post");
            ctx.report.skipped += 1;
            return Ok(());
        }

        if dedup.lookup(&post.id).await?.is_some() {
            debug!(post_id = %post.id, "Already responded");
            ctx.report.already_responded += 1;
            ctx.observe_kept(&post.id);
            return Ok(());
        }

        let reply_text = select(post, config)?;

        if !dedup.record(&post.id, &reply_text).await? {
            warn!(post_id = %post.id, "Post was claimed by another run");
            ctx.report.already_responded += 1;
            ctx.observe_kept(&post.id);
            return Ok(());
        }

        if config.dry_run {
            info!(post_id = %post.id, "[dry run] Would reply: {}", reply_text);
            ctx.report.rehearsed += 1;
        } else {
            match self.client.reply(&reply_text, &post.id).await {
                Ok(()) => {
                    info!(post_id = %post.id, author = %post.author_handle, "Replied");
                    ctx.report.replied += 1;
                }
                Err(e) => {
                    let send_error = CoreError::Send {
                        post_id: post.id.to_string(),
                        source: Box::new(e),
                    };
                    self.reporter.report_error(&send_error);
                    ctx.report.send_failures += 1;
                }
            }
        }

        ctx.observe_kept(&post.id);
        Ok(())
    }
}
