//! Extraction run orchestration: authenticate, page through, assemble, deliver

use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use restline_core::{Credential, ObjectSink, TokenProvider, Transport, fmt_num};

use crate::collector::ConcurrentPageCollector;
use crate::config::Config;
use crate::dataset::{DatasetKind, PaginationStrategy};
use crate::error::ExtractError;
use crate::export::ExportJobClient;
use crate::fetcher::PagedResourceFetcher;
use crate::filter::RecordFilter;
use crate::page::{CallCounter, Record};
use crate::serialize::serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Init,
    Authenticated,
    Extracting,
    Assembled,
    Delivered,
    Failed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Authenticated => "authenticated",
            Self::Extracting => "extracting",
            Self::Assembled => "assembled",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything one run accumulates, threaded explicitly through each step
#[derive(Debug)]
pub struct RunContext {
    state: EngineState,
    credential: Option<Credential>,
    calls: CallCounter,
    dataset: Vec<Record>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            state: EngineState::Init,
            credential: None,
            calls: CallCounter::new(),
            dataset: Vec::new(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn api_calls(&self) -> usize {
        self.calls.get()
    }

    pub fn dataset(&self) -> &[Record] {
        &self.dataset
    }

    fn transition(&mut self, next: EngineState) {
        log::debug!("engine: {} -> {next}", self.state);
        self.state = next;
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of an extraction run
#[derive(Debug)]
pub struct RunSummary {
    pub dataset: DatasetKind,
    pub records: usize,
    pub api_calls: usize,
    pub delivered_key: Option<String>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn log(&self) {
        log::info!("=== Extraction Summary ===");
        log::info!("Dataset: {}", self.dataset);
        log::info!("Records: {}", fmt_num(self.records));
        log::info!("Total API calls made: {}", self.api_calls);
        match &self.delivered_key {
            Some(key) => log::info!("Delivered to: {key}"),
            None => log::info!("Nothing delivered (empty dataset)"),
        }
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

pub struct ExtractionEngine<'a> {
    config: &'a Config,
    transport: &'a dyn Transport,
    sink: &'a dyn ObjectSink,
    pb: ProgressBar,
}

impl<'a> ExtractionEngine<'a> {
    pub fn new(config: &'a Config, transport: &'a dyn Transport, sink: &'a dyn ObjectSink) -> Self {
        Self {
            config,
            transport,
            sink,
            pb: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.pb = pb;
        self
    }

    /// Run to `Delivered`, or stop at the first fatal error
    pub fn run(&self) -> Result<RunSummary, ExtractError> {
        let mut ctx = RunContext::new();
        self.run_with(&mut ctx)
    }

    /// Like [`run`](Self::run), leaving the final state and data in `ctx`
    pub fn run_with(&self, ctx: &mut RunContext) -> Result<RunSummary, ExtractError> {
        let start = Instant::now();
        let result = self.drive(ctx, start);
        self.pb.finish_and_clear();
        if let Err(e) = &result {
            log::error!("Extraction failed in state {}: {e}", ctx.state);
            log::info!("Total API calls made: {}", ctx.api_calls());
            ctx.transition(EngineState::Failed);
        }
        result
    }

    fn drive(&self, ctx: &mut RunContext, start: Instant) -> Result<RunSummary, ExtractError> {
        self.pb.set_message("authenticating...");
        let credential = TokenProvider::new(self.transport).acquire(&self.config.credentials)?;
        ctx.credential = Some(credential);
        ctx.transition(EngineState::Authenticated);

        let kind = DatasetKind::from_name(&self.config.dataset)
            .ok_or_else(|| ExtractError::UnsupportedDataset(self.config.dataset.clone()))?;
        ctx.transition(EngineState::Extracting);
        self.extract(ctx, kind)?;
        ctx.transition(EngineState::Assembled);
        log::info!(
            "{kind}: assembled {} records with {} API calls",
            fmt_num(ctx.dataset.len()),
            ctx.api_calls()
        );

        let delivered_key = self.deliver(ctx, kind)?;
        ctx.transition(EngineState::Delivered);

        let summary = RunSummary {
            dataset: kind,
            records: ctx.dataset.len(),
            api_calls: ctx.api_calls(),
            delivered_key,
            elapsed: start.elapsed(),
        };
        summary.log();
        Ok(summary)
    }

    fn extract(&self, ctx: &mut RunContext, kind: DatasetKind) -> Result<(), ExtractError> {
        let filter = RecordFilter::new(&self.config.exclude_substring);
        let strategy = kind.strategy(self.config.page_size, self.config.export_page_size);
        let RunContext {
            credential,
            calls,
            dataset,
            ..
        } = ctx;
        let credential = credential
            .as_ref()
            .ok_or_else(|| ExtractError::Protocol("extraction started before authentication".into()))?;

        match (strategy, kind.endpoint_path()) {
            (PaginationStrategy::Offset { page_size }, Some(path)) => {
                let fetcher =
                    PagedResourceFetcher::new(self.transport, self.config.endpoint_url(path));
                let collector = ConcurrentPageCollector::new(fetcher, self.config.workers, page_size);
                let stats = collector.collect(kind, &filter, credential, calls, dataset, &self.pb)?;
                log::info!(
                    "{kind}: {} batches, {} pages ({} skipped), {} records dropped by filter",
                    stats.batches,
                    stats.pages_fetched + stats.pages_skipped,
                    stats.pages_skipped,
                    stats.records_dropped
                );
            }
            (PaginationStrategy::Token { page_size }, _) => {
                self.pb.set_message("starting report export...");
                let client = ExportJobClient::new(
                    self.transport,
                    &self.config.base_url,
                    page_size,
                    self.config.retry_backoff,
                );
                let mut job = client.start(credential, &self.config.report_name)?;
                self.pb.set_message("reading export results...");
                let mut rows = Vec::new();
                client.collect(credential, calls, &mut job, &mut rows)?;
                dataset.extend(filter.apply(kind, &rows));
            }
            (PaginationStrategy::Offset { .. }, None) => {
                return Err(ExtractError::UnsupportedDataset(kind.to_string()));
            }
        }
        Ok(())
    }

    /// Serialize and hand to the sink; an empty dataset is a no-op
    fn deliver(&self, ctx: &RunContext, kind: DatasetKind) -> Result<Option<String>, ExtractError> {
        if ctx.dataset.is_empty() {
            log::warn!("{kind}: no records extracted, nothing to deliver");
            return Ok(None);
        }
        self.pb.set_message("writing output...");
        let body = serialize(kind.output_format(), &ctx.dataset)?;
        let key = self.config.destination_key(&kind.file_name());
        self.sink
            .put(&key, &body)
            .map_err(|source| ExtractError::Sink {
                key: key.clone(),
                source,
            })?;
        Ok(Some(key))
    }
}
