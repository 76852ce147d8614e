//! Restline Core - shared infrastructure for REST extraction pipelines
//!
//! HTTP transport, OAuth2 token acquisition, retry policy, sinks for
//! extracted data and run notifications, plus logging and progress output.

pub mod auth;
pub mod http;
pub mod logging;
pub mod notify;
pub mod progress;
pub mod retry;
pub mod sink;

// Re-exports for convenience
pub use auth::{AuthError, Credential, GrantType, OAuthCredentials, TokenProvider};
pub use http::{HttpError, HttpReply, HttpRequest, Method, ReqwestTransport, Transport};
pub use logging::{IndicatifLogger, init_logging};
pub use notify::{LogNotifier, Notification, NotificationSink, RunOrigin};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::{EXPORT_RETRY_BACKOFF, retry_transient};
pub use sink::{LocalObjectSink, ObjectSink};
