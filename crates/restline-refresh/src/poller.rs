//! Trigger a remote dataset refresh and poll it to a terminal state

use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use restline_core::{AuthError, Credential, HttpError, HttpRequest, TokenProvider, Transport};

use crate::config::Config;
use crate::status::{RefreshHistory, RefreshStatus};

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("failed to trigger refresh: {0}")]
    Trigger(HttpError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollState {
    Triggered,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

/// A triggered refresh and what has been observed of it
#[derive(Debug)]
pub struct RefreshJob {
    pub triggered_at: Instant,
    pub interval: Duration,
    pub timeout: Duration,
    pub state: PollState,
    pub last_status: RefreshStatus,
    pub polls: usize,
}

impl RefreshJob {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            triggered_at: Instant::now(),
            interval,
            timeout,
            state: PollState::Triggered,
            last_status: RefreshStatus::Unknown,
            polls: 0,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.triggered_at.elapsed()
    }

    fn deadline_exceeded(&self) -> bool {
        self.elapsed() > self.timeout
    }

    /// Record one status check and advance the state machine.
    ///
    /// A terminal status wins over the deadline when both hold on the same tick.
    fn observe(&mut self, status: RefreshStatus) {
        self.polls += 1;
        self.state = if status.is_terminal() {
            match status {
                RefreshStatus::Completed => PollState::Completed,
                _ => PollState::Failed,
            }
        } else if self.deadline_exceeded() {
            PollState::TimedOut
        } else {
            PollState::Polling
        };
        self.last_status = status;
    }
}

/// Final report of a poll run. `TimedOut` is a normal outcome, not an error.
#[derive(Debug)]
pub struct PollReport {
    pub state: PollState,
    pub last_status: RefreshStatus,
    pub polls: usize,
    pub elapsed: Duration,
}

pub struct RemoteJobPoller<'a> {
    config: &'a Config,
    transport: &'a dyn Transport,
    pb: ProgressBar,
}

impl<'a> RemoteJobPoller<'a> {
    pub fn new(config: &'a Config, transport: &'a dyn Transport) -> Self {
        Self {
            config,
            transport,
            pb: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.pb = pb;
        self
    }

    /// Authenticate, trigger, and poll until Completed, Failed or timeout.
    ///
    /// There is no cancellation; an in-flight status check always finishes
    /// before the deadline is looked at.
    pub fn run(&self) -> Result<PollReport, PollError> {
        let result = self.drive();
        self.pb.finish_and_clear();
        result
    }

    fn drive(&self) -> Result<PollReport, PollError> {
        self.pb.set_message("authenticating...");
        let credential = TokenProvider::new(self.transport).acquire(&self.config.credentials())?;
        self.pb.set_message("triggering refresh...");
        self.trigger(&credential)?;

        let mut job = RefreshJob::new(self.config.interval, self.config.timeout);
        while !job.state.is_terminal() {
            std::thread::sleep(job.interval);
            let status = self.check_status(&credential);
            job.observe(status);
            self.pb.set_message(format!(
                "status {} after {}s",
                job.last_status,
                job.elapsed().as_secs()
            ));
            match job.state {
                PollState::Completed => log::info!("Dataset refresh is completed."),
                PollState::Failed => log::error!("Dataset refresh failed."),
                PollState::TimedOut => {
                    log::warn!("Timeout waiting for dataset refresh completion.");
                    log::warn!(
                        "Dataset refresh status not conclusive after timeout (last: {}).",
                        job.last_status
                    );
                }
                _ => log::info!(
                    "Dataset refresh is still running. Status: {}",
                    job.last_status
                ),
            }
        }

        Ok(PollReport {
            state: job.state,
            last_status: job.last_status.clone(),
            polls: job.polls,
            elapsed: job.elapsed(),
        })
    }

    /// POST to the refreshes collection; any non-2xx is fatal
    pub fn trigger(&self, credential: &Credential) -> Result<(), PollError> {
        let request = HttpRequest::post(self.config.refreshes_url()).bearer(credential.bearer());
        let reply = self.transport.execute(&request).map_err(PollError::Trigger)?;
        if !reply.is_success() {
            let err = reply.error();
            log::error!("Failed to trigger dataset refresh: {err}");
            return Err(PollError::Trigger(err));
        }
        log::info!("Dataset refresh triggered successfully (HTTP {}).", reply.status);
        Ok(())
    }

    /// Latest refresh status. A failed check reads as `Unknown` for this tick.
    pub fn check_status(&self, credential: &Credential) -> RefreshStatus {
        let request = HttpRequest::get(self.config.refreshes_url())
            .query("$top", 1)
            .bearer(credential.bearer());
        let reply = match self.transport.execute(&request) {
            Ok(r) if r.is_success() => r,
            Ok(r) => {
                log::warn!("Status check failed: {}", r.error());
                return RefreshStatus::Unknown;
            }
            Err(e) => {
                log::warn!("Status check failed: {e}");
                return RefreshStatus::Unknown;
            }
        };
        match reply.json::<RefreshHistory>() {
            Ok(history) => history.latest(),
            Err(e) => {
                log::warn!("Unreadable status response: {e}");
                RefreshStatus::Unknown
            }
        }
    }
}
