//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use restline_core::{GrantType, OAuthCredentials};
use serde::Deserialize;

/// Global configuration for restline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub api: ApiConfig,
    pub workers: WorkersConfig,
    pub output: OutputConfig,
    pub refresh: RefreshConfig,
    pub notify: NotifyConfig,
}

/// Credentials for the LMS token endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub client_id: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub client_secret: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub username: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub password: Option<String>,
    pub scope: String,
    pub grant_type: GrantType,
    /// Token endpoint; `<api.base_url>/oauth2/token` when empty
    pub token_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: std::env::var("RESTLINE_CLIENT_SECRET").ok(),
            username: None,
            password: std::env::var("RESTLINE_PASSWORD").ok(),
            scope: "api".to_string(),
            grant_type: GrantType::Password,
            token_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub page_size: usize,
    pub export_page_size: usize,
    pub report_name: String,
    pub exclude_substring: String,
    pub retry_backoff_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            page_size: restline_lms::config::DEFAULT_PAGE_SIZE,
            export_page_size: restline_lms::config::DEFAULT_EXPORT_PAGE_SIZE,
            report_name: String::new(),
            exclude_substring: restline_lms::filter::DEFAULT_EXCLUDE_SUBSTRING.to_string(),
            retry_backoff_secs: restline_core::EXPORT_RETRY_BACKOFF.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub default: usize,
    /// Upper bound for `--workers` overrides
    pub max: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            default: restline_lms::config::default_workers(),
            max: 64,
        }
    }
}

impl WorkersConfig {
    /// The configured default, or a CLI override clamped to `1..=max`
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(n) => n.clamp(1, self.max.max(1)),
            None => self.default.max(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Local directory standing in for the object store bucket
    pub root: PathBuf,
    /// Folder below the root that datasets are written to
    pub destination: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data"),
            destination: "lms".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub tenant: String,
    pub client_id: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub client_secret: Option<String>,
    pub scope: String,
    pub token_url: Option<String>,
    pub base_url: String,
    pub workspace_id: String,
    pub dataset_id: String,
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            tenant: String::new(),
            client_id: String::new(),
            client_secret: std::env::var("RESTLINE_REFRESH_SECRET").ok(),
            scope: restline_refresh::config::DEFAULT_SCOPE.to_string(),
            token_url: None,
            base_url: restline_refresh::config::DEFAULT_BASE_URL.to_string(),
            workspace_id: String::new(),
            dataset_id: String::new(),
            interval_secs: restline_refresh::config::DEFAULT_INTERVAL.as_secs(),
            timeout_secs: restline_refresh::config::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub enabled: bool,
    pub environment: String,
    pub ui_link: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            environment: "dev".to_string(),
            ui_link: String::new(),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./restline.toml (current directory)
    /// 2. ~/.config/restline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("restline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "restline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// OAuth credentials for the LMS API
    pub fn lms_credentials(&self) -> OAuthCredentials {
        let token_url = if self.auth.token_url.is_empty() {
            format!("{}/oauth2/token", self.api.base_url.trim_end_matches('/'))
        } else {
            self.auth.token_url.clone()
        };
        OAuthCredentials {
            client_id: self.auth.client_id.clone(),
            client_secret: self.auth.client_secret.clone().unwrap_or_default(),
            grant_type: self.auth.grant_type,
            scope: self.auth.scope.clone(),
            username: self.auth.username.clone(),
            password: self.auth.password.clone(),
            token_url,
        }
    }

    /// Extraction settings for one dataset
    pub fn lms(&self, dataset: &str, workers: Option<usize>) -> restline_lms::Config {
        restline_lms::Config {
            credentials: self.lms_credentials(),
            base_url: self.api.base_url.clone(),
            dataset: dataset.to_string(),
            workers: self.workers.resolve(workers),
            page_size: self.api.page_size,
            export_page_size: self.api.export_page_size,
            report_name: self.api.report_name.clone(),
            exclude_substring: self.api.exclude_substring.clone(),
            retry_backoff: Duration::from_secs(self.api.retry_backoff_secs),
            destination: self.output.destination.clone(),
        }
    }

    /// Refresh poller settings
    pub fn refresh(&self) -> restline_refresh::Config {
        let r = &self.refresh;
        restline_refresh::Config {
            tenant: r.tenant.clone(),
            client_id: r.client_id.clone(),
            client_secret: r.client_secret.clone().unwrap_or_default(),
            scope: r.scope.clone(),
            token_url: r.token_url.clone(),
            base_url: r.base_url.clone(),
            workspace_id: r.workspace_id.clone(),
            dataset_id: r.dataset_id.clone(),
            interval: Duration::from_secs(r.interval_secs),
            timeout: Duration::from_secs(r.timeout_secs),
        }
    }
}
