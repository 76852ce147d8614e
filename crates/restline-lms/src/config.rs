//! Extraction run configuration

use std::time::Duration;

use restline_core::{EXPORT_RETRY_BACKOFF, GrantType, OAuthCredentials};

use crate::filter::DEFAULT_EXCLUDE_SUBSTRING;

/// Default page size for listing endpoints
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Default page size for export results
pub const DEFAULT_EXPORT_PAGE_SIZE: usize = 1000;

/// Runtime configuration for one extraction run
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: OAuthCredentials,
    /// API base, e.g. `https://tenant.example.com`
    pub base_url: String,
    /// Dataset tag (`user`, `courses`, `enrollments`, `reports`)
    pub dataset: String,
    pub workers: usize,
    pub page_size: usize,
    pub export_page_size: usize,
    /// Exact name of the report exported by the `reports` dataset
    pub report_name: String,
    pub exclude_substring: String,
    pub retry_backoff: Duration,
    /// Folder the serialized dataset is written under
    pub destination: String,
}

/// Logical core count, the collector's default pool size
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: OAuthCredentials {
                client_id: String::new(),
                client_secret: String::new(),
                grant_type: GrantType::Password,
                scope: "api".to_string(),
                username: None,
                password: None,
                token_url: String::new(),
            },
            base_url: String::new(),
            dataset: String::new(),
            workers: default_workers(),
            page_size: DEFAULT_PAGE_SIZE,
            export_page_size: DEFAULT_EXPORT_PAGE_SIZE,
            report_name: String::new(),
            exclude_substring: DEFAULT_EXCLUDE_SUBSTRING.to_string(),
            retry_backoff: EXPORT_RETRY_BACKOFF,
            destination: String::new(),
        }
    }
}

impl Config {
    /// Full URL of a listing endpoint below the API base
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// Object key for a file under the destination folder
    pub fn destination_key(&self, file_name: &str) -> String {
        let folder = self.destination.trim_matches('/');
        if folder.is_empty() {
            file_name.to_string()
        } else {
            format!("{folder}/{file_name}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert!(c.workers >= 1);
        assert_eq!(c.page_size, 200);
        assert_eq!(c.export_page_size, 1000);
        assert_eq!(c.retry_backoff, Duration::from_secs(5));
        assert_eq!(c.exclude_substring, "onetrust");
        assert_eq!(c.credentials.grant_type, GrantType::Password);
    }

    #[test]
    fn endpoint_url_joins_cleanly() {
        let c = Config {
            base_url: "https://lms.example.com/".into(),
            ..Default::default()
        };
        assert_eq!(
            c.endpoint_url("/manage/v1/user"),
            "https://lms.example.com/manage/v1/user"
        );
    }

    #[test]
    fn destination_key_variants() {
        let mut c = Config::default();
        assert_eq!(c.destination_key("user.json"), "user.json");
        c.destination = "landing/lms/".into();
        assert_eq!(c.destination_key("user.json"), "landing/lms/user.json");
        c.destination = "/archive".into();
        assert_eq!(c.destination_key("reports.csv"), "archive/reports.csv");
    }
}
