//! Restline Refresh - trigger a remote dataset refresh and wait for it
//!
//! Authenticates with a client-credentials grant, POSTs a refresh request,
//! then polls the latest refresh status at a fixed interval until it
//! completes, fails, or the timeout passes.

pub mod config;
pub mod poller;
pub mod status;

// Re-exports for convenience
pub use config::Config;
pub use poller::{PollError, PollReport, PollState, RefreshJob, RemoteJobPoller};
pub use status::RefreshStatus;
