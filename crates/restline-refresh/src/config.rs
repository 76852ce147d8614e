//! Refresh poller configuration

use std::time::Duration;

use restline_core::{GrantType, OAuthCredentials};

pub const DEFAULT_BASE_URL: &str = "https://api.powerbi.com/v1.0/myorg";
pub const DEFAULT_SCOPE: &str = "https://analysis.windows.net/powerbi/api/.default";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct Config {
    pub tenant: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    /// Token endpoint; derived from the tenant when unset
    pub token_url: Option<String>,
    pub base_url: String,
    pub workspace_id: String,
    pub dataset_id: String,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tenant: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            scope: DEFAULT_SCOPE.to_string(),
            token_url: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            workspace_id: String::new(),
            dataset_id: String::new(),
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    /// Client-credentials grant against the tenant's token endpoint
    pub fn credentials(&self) -> OAuthCredentials {
        let token_url = self.token_url.clone().unwrap_or_else(|| {
            format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                self.tenant
            )
        });
        OAuthCredentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            grant_type: GrantType::ClientCredentials,
            scope: self.scope.clone(),
            username: None,
            password: None,
            token_url,
        }
    }

    /// Collection URL for the dataset's refreshes (POST to trigger)
    pub fn refreshes_url(&self) -> String {
        format!(
            "{}/groups/{}/datasets/{}/refreshes",
            self.base_url.trim_end_matches('/'),
            self.workspace_id,
            self.dataset_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.interval, Duration::from_secs(300));
        assert_eq!(c.timeout, Duration::from_secs(3600));
    }

    #[test]
    fn token_url_from_tenant() {
        let c = Config {
            tenant: "contoso.onmicrosoft.com".into(),
            ..Default::default()
        };
        let creds = c.credentials();
        assert_eq!(
            creds.token_url,
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
        assert_eq!(creds.grant_type, GrantType::ClientCredentials);
        assert_eq!(creds.scope, DEFAULT_SCOPE);
    }

    #[test]
    fn explicit_token_url_wins() {
        let c = Config {
            token_url: Some("http://localhost/token".into()),
            ..Default::default()
        };
        assert_eq!(c.credentials().token_url, "http://localhost/token");
    }

    #[test]
    fn refreshes_url() {
        let c = Config {
            base_url: "https://api.example.com/v1/".into(),
            workspace_id: "ws".into(),
            dataset_id: "ds".into(),
            ..Default::default()
        };
        assert_eq!(
            c.refreshes_url(),
            "https://api.example.com/v1/groups/ws/datasets/ds/refreshes"
        );
    }
}
