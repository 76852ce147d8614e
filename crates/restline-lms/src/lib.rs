//! Restline LMS - paginated extraction from an LMS REST API
//!
//! Offset-paginated listings (users, courses, enrollments) are fetched
//! concurrently in barrier-synchronized batches; the report dataset goes
//! through an asynchronous export job paged by continuation tokens.
//!
//! # Example
//!
//! ```no_run
//! use restline_core::{LocalObjectSink, ReqwestTransport};
//! use restline_lms::{Config, ExtractionEngine};
//!
//! let config = Config {
//!     base_url: "https://tenant.example.com".into(),
//!     dataset: "user".into(),
//!     ..Default::default()
//! };
//! let transport = ReqwestTransport::new();
//! let sink = LocalObjectSink::new("./data");
//! let summary = ExtractionEngine::new(&config, &transport, &sink).run()?;
//! println!("{} records", summary.records);
//! # Ok::<(), restline_lms::ExtractError>(())
//! ```

pub mod collector;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod filter;
pub mod page;
pub mod serialize;

// Re-exports for convenience
pub use collector::{CollectStats, ConcurrentPageCollector};
pub use config::Config;
pub use dataset::{DatasetKind, PaginationStrategy};
pub use engine::{EngineState, ExtractionEngine, RunContext, RunSummary};
pub use error::ExtractError;
pub use export::{ExportJob, ExportJobClient};
pub use fetcher::PagedResourceFetcher;
pub use filter::RecordFilter;
pub use page::{CallCounter, PageOutcome, PageRequest, PageResult, Record};
