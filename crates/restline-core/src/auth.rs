//! OAuth2 token acquisition

use serde::{Deserialize, Serialize};

use crate::http::{HttpError, HttpRequest, Transport};

/// OAuth2 grant flows supported by the token endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Resource owner password credentials
    Password,
    ClientCredentials,
}

impl GrantType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the token endpoint needs for one grant
#[derive(Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub grant_type: GrantType,
    pub scope: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token_url: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("grant_type", &self.grant_type)
            .field("scope", &self.scope)
            .field("username", &self.username)
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

impl OAuthCredentials {
    /// Form body for the token POST. Username and password are only sent
    /// for the password grant.
    fn form(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("client_id".to_string(), self.client_id.clone()),
            ("client_secret".to_string(), self.client_secret.clone()),
            ("grant_type".to_string(), self.grant_type.as_str().to_string()),
            ("scope".to_string(), self.scope.clone()),
        ];
        if self.grant_type == GrantType::Password {
            if let Some(username) = &self.username {
                fields.push(("username".to_string(), username.clone()));
            }
            if let Some(password) = &self.password {
                fields.push(("password".to_string(), password.clone()));
            }
        }
        fields
    }
}

/// Bearer token for a single run. Never persisted, never logged.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn bearer(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token endpoint rejected credentials: {0}")]
    Rejected(HttpError),
    #[error("token response has no access_token field")]
    MissingToken,
    #[error("token request failed: {0}")]
    Transport(#[from] HttpError),
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Acquires bearer credentials. A single attempt, no retry.
pub struct TokenProvider<'a> {
    transport: &'a dyn Transport,
}

impl<'a> TokenProvider<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    pub fn acquire(&self, creds: &OAuthCredentials) -> Result<Credential, AuthError> {
        log::debug!(
            "Requesting {} token for client {}",
            creds.grant_type,
            creds.client_id
        );
        let request = HttpRequest::post(&creds.token_url).form(creds.form());
        let reply = self.transport.execute(&request)?;
        if !reply.is_success() {
            return Err(AuthError::Rejected(reply.error()));
        }
        let body: TokenResponse = reply.json().map_err(|_| AuthError::MissingToken)?;
        match body.access_token {
            Some(token) if !token.is_empty() => {
                log::info!("Access token acquired");
                Ok(Credential(token))
            }
            _ => Err(AuthError::MissingToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::MockTransport;
    use crate::http::HttpReply;

    fn creds(grant_type: GrantType) -> OAuthCredentials {
        OAuthCredentials {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            grant_type,
            scope: "api".into(),
            username: Some("svc".into()),
            password: Some("pw".into()),
            token_url: "https://lms.example.com/oauth2/token".into(),
        }
    }

    #[test]
    fn password_grant_posts_full_form() {
        let transport =
            MockTransport::sequence(vec![HttpReply::new(200, r#"{"access_token":"abc"}"#)]);
        let cred = TokenProvider::new(&transport)
            .acquire(&creds(GrantType::Password))
            .unwrap();
        assert_eq!(cred.bearer(), "abc");

        let call = &transport.calls()[0];
        assert_eq!(call.url, "https://lms.example.com/oauth2/token");
        assert_eq!(call.form_value("client_id"), Some("cid"));
        assert_eq!(call.form_value("client_secret"), Some("secret"));
        assert_eq!(call.form_value("grant_type"), Some("password"));
        assert_eq!(call.form_value("scope"), Some("api"));
        assert_eq!(call.form_value("username"), Some("svc"));
        assert_eq!(call.form_value("password"), Some("pw"));
    }

    #[test]
    fn client_credentials_omit_user_fields() {
        let transport =
            MockTransport::sequence(vec![HttpReply::new(200, r#"{"access_token":"abc"}"#)]);
        TokenProvider::new(&transport)
            .acquire(&creds(GrantType::ClientCredentials))
            .unwrap();
        let call = &transport.calls()[0];
        assert_eq!(call.form_value("grant_type"), Some("client_credentials"));
        assert_eq!(call.form_value("username"), None);
        assert_eq!(call.form_value("password"), None);
    }

    #[test]
    fn non_2xx_is_rejected() {
        let transport = MockTransport::sequence(vec![HttpReply::new(401, "bad creds")]);
        let err = TokenProvider::new(&transport)
            .acquire(&creds(GrantType::Password))
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn missing_access_token_field() {
        let transport =
            MockTransport::sequence(vec![HttpReply::new(200, r#"{"token_type":"bearer"}"#)]);
        let err = TokenProvider::new(&transport)
            .acquire(&creds(GrantType::Password))
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[test]
    fn non_json_body_is_missing_token() {
        let transport = MockTransport::sequence(vec![HttpReply::new(200, "<html/>")]);
        let err = TokenProvider::new(&transport)
            .acquire(&creds(GrantType::Password))
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[test]
    fn credential_debug_is_masked() {
        let cred = Credential::new("super-secret");
        assert_eq!(format!("{cred:?}"), "Credential(***)");
        let debug = format!("{:?}", creds(GrantType::Password));
        assert!(!debug.contains("secret\""));
        assert!(!debug.contains("pw"));
    }

    #[test]
    fn grant_type_deserializes_snake_case() {
        let g: GrantType = serde_json::from_str("\"client_credentials\"").unwrap();
        assert_eq!(g, GrantType::ClientCredentials);
        assert_eq!(GrantType::Password.to_string(), "password");
    }
}
