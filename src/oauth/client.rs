use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oauth2::{
  basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType},
  reqwest::async_http_client,
  AuthUrl, ClientId, ClientSecret, CsrfToken, RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse,
  TokenUrl,
};
use tracing::debug;

use super::{TokenError, GMAIL_SEND_SCOPE};

/// OAuth2 client registration plus the stored refresh token.
#[derive(Clone)]
pub struct OAuthConfig {
  pub client_id: String,
  pub client_secret: String,
  pub redirect_uri: String,
  pub refresh_token: String,
  pub auth_url: String,
  pub token_url: String,
}

impl std::fmt::Debug for OAuthConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OAuthConfig")
      .field("client_id", &self.client_id)
      .field("client_secret", &"[redacted]")
      .field("redirect_uri", &self.redirect_uri)
      .field("refresh_token", &"[redacted]")
      .field("auth_url", &self.auth_url)
      .field("token_url", &self.token_url)
      .finish()
  }
}

/// Short-lived credential for a single transport session.
#[derive(Clone)]
pub struct AccessToken {
  secret: String,
  pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
  pub fn new(secret: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
    Self {
      secret: secret.into(),
      expires_at,
    }
  }

  pub fn secret(&self) -> &str {
    &self.secret
  }
}

impl std::fmt::Debug for AccessToken {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AccessToken")
      .field("secret", &"[redacted]")
      .field("expires_at", &self.expires_at)
      .finish()
  }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OAuthClient: Send + Sync {
  /// Exchange the stored refresh token for a fresh access token.
  async fn access_token(&self) -> Result<AccessToken, TokenError>;

  /// URL an operator visits to grant offline mail-send access again.
  fn authorization_url(&self) -> String;
}

pub struct GoogleOAuthClient {
  client: BasicClient,
  refresh_token: RefreshToken,
}

impl GoogleOAuthClient {
  pub fn new(config: &OAuthConfig) -> Result<Self, TokenError> {
    let auth_url = AuthUrl::new(config.auth_url.clone())
      .map_err(|e| TokenError::InvalidConfig(format!("Invalid auth URL: {}", e)))?;
    let token_url = TokenUrl::new(config.token_url.clone())
      .map_err(|e| TokenError::InvalidConfig(format!("Invalid token URL: {}", e)))?;
    let redirect_url = RedirectUrl::new(config.redirect_uri.clone())
      .map_err(|e| TokenError::InvalidConfig(format!("Invalid redirect URL: {}", e)))?;

    let client = BasicClient::new(
      ClientId::new(config.client_id.clone()),
      Some(ClientSecret::new(config.client_secret.clone())),
      auth_url,
      Some(token_url),
    )
    .set_redirect_uri(redirect_url);

    Ok(Self {
      client,
      refresh_token: RefreshToken::new(config.refresh_token.clone()),
    })
  }
}

#[async_trait]
impl OAuthClient for GoogleOAuthClient {
  async fn access_token(&self) -> Result<AccessToken, TokenError> {
    let response = self
      .client
      .exchange_refresh_token(&self.refresh_token)
      .request_async(async_http_client)
      .await
      .map_err(classify_token_error)?;

    let expires_at = response
      .expires_in()
      .and_then(|lifetime| chrono::Duration::from_std(lifetime).ok())
      .map(|lifetime| Utc::now() + lifetime);

    debug!(?expires_at, "Obtained access token");

    Ok(AccessToken::new(response.access_token().secret().clone(), expires_at))
  }

  fn authorization_url(&self) -> String {
    let (url, _csrf_token) = self
      .client
      .authorize_url(CsrfToken::new_random)
      .add_scope(Scope::new(GMAIL_SEND_SCOPE.to_string()))
      .add_extra_param("access_type", "offline")
      .url();

    url.to_string()
  }
}

fn classify_token_error<RE>(error: RequestTokenError<RE, BasicErrorResponse>) -> TokenError
where
  RE: std::error::Error + 'static,
{
  match error {
    RequestTokenError::ServerResponse(response) => {
      let detail = match response.error_description() {
        Some(description) => format!("{} ({})", response.error(), description),
        None => response.error().to_string(),
      };

      if *response.error() == BasicErrorResponseType::InvalidGrant {
        TokenError::InvalidGrant(detail)
      } else {
        TokenError::Rejected(detail)
      }
    }
    RequestTokenError::Request(e) => TokenError::Request(e.to_string()),
    RequestTokenError::Parse(e, _body) => TokenError::Request(format!("Malformed token response: {}", e)),
    RequestTokenError::Other(msg) => TokenError::Request(msg),
  }
}
