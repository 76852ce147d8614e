//! Blocking HTTP transport over a shared async client.
//!
//! Uses async reqwest on a shared tokio runtime, but presents a sync interface
//! so rayon page workers and the poll loop can call it directly.

use std::sync::LazyLock;
use std::time::Duration;

use serde::de::DeserializeOwned;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-request timeout (a stalled page must not hang its batch forever)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Error types for HTTP operations
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Transport-level failure or non-success status
    #[error("{}", fmt_http(.status, .message))]
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Response body did not match the expected shape
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

fn fmt_http(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(s) => format!("HTTP {s}: {message}"),
        None => format!("HTTP error: {message}"),
    }
}

impl HttpError {
    /// Create HTTP error from reqwest error.
    ///
    /// The URL is stripped so endpoints carrying query secrets stay out of logs.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.without_url().to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            Self::Decode(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single outgoing request, independent of the client that sends it
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub form: Option<Vec<(String, String)>>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            bearer: None,
            form: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(url)
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.form = Some(fields);
        self
    }

    /// First query value for `key`
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First form value for `key`
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed exchange. Non-2xx statuses are returned,
/// not raised; each caller decides its own policy.
#[derive(Clone, Debug)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Convert a non-2xx reply into an error carrying a truncated body
    pub fn error(&self) -> HttpError {
        let mut message: String = self.body.chars().take(200).collect();
        if message.is_empty() {
            message = "empty response body".to_string();
        }
        HttpError::Http {
            status: Some(self.status),
            message,
        }
    }
}

/// Seam between the extraction logic and the network.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpReply, HttpError>;
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<Result<reqwest::Client, String>> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .pool_max_idle_per_host(16)
        .build()
        .map_err(|e| e.to_string())
});

/// Shared tokio runtime for HTTP operations.
static SHARED_RUNTIME: LazyLock<Result<tokio::runtime::Runtime, String>> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("restline-http")
        .enable_all()
        .build()
        .map_err(|e| e.to_string())
});

/// Production transport backed by reqwest
#[derive(Debug, Default, Clone, Copy)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    pub fn new() -> Self {
        Self
    }
}

fn init_error(what: &str, e: &str) -> HttpError {
    HttpError::Http {
        status: None,
        message: format!("failed to build {what}: {e}"),
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpReply, HttpError> {
        let client = SHARED_CLIENT
            .as_ref()
            .map_err(|e| init_error("HTTP client", e))?;
        let runtime = SHARED_RUNTIME
            .as_ref()
            .map_err(|e| init_error("tokio runtime", e))?;

        let mut builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        runtime.handle().block_on(async {
            let response = builder.send().await.map_err(HttpError::from_reqwest)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(HttpError::from_reqwest)?;
            Ok::<_, HttpError>(HttpReply { status, body })
        })
    }
}

/// In-memory transport for tests: a handler decides each reply and every
/// request is recorded in arrival order.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::{HttpError, HttpReply, HttpRequest, Transport};

    type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpReply, HttpError> + Send + Sync>;

    pub struct MockTransport {
        handler: Handler,
        calls: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        pub fn new(
            handler: impl Fn(&HttpRequest) -> Result<HttpReply, HttpError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                handler: Box::new(handler),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Replies in order; panics when the script runs dry
        pub fn sequence(replies: Vec<HttpReply>) -> Self {
            let queue = Mutex::new(VecDeque::from(replies));
            Self::new(move |req| {
                let next = queue.lock().unwrap().pop_front();
                Ok(next.unwrap_or_else(|| panic!("unscripted request to {}", req.url)))
            })
        }

        pub fn calls(&self) -> Vec<HttpRequest> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Transport for MockTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpReply, HttpError> {
            self.calls.lock().unwrap().push(request.clone());
            (self.handler)(request)
        }
    }
}
