use std::{collections::HashMap, time::Duration};

use thiserror::Error;

use crate::{
  email::{MailIdentity, SmtpConfig},
  middleware::rate_limit::RateLimitPolicy,
  oauth::OAuthConfig,
};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SENDER_NAME: &str = "Contact Form";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("{0} environment variable must be set.")]
  Missing(&'static str),

  #[error("{key} has an invalid value: {value}")]
  Invalid { key: &'static str, value: String },
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
  pub port: u16,
  pub oauth: OAuthConfig,
  pub smtp: SmtpConfig,
  pub identity: MailIdentity,
  pub rate_limit: RateLimitPolicy,
  pub trust_proxy: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
    Self::from_lookup(|key| vars.get(key).cloned())
  }

  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let vars = Vars(lookup);

    let sender_email = vars.required("EMAIL")?;

    let oauth = OAuthConfig {
      client_id: vars.required("CLIENT_ID")?,
      client_secret: vars.required("CLIENT_SECRET")?,
      redirect_uri: vars.required("REDIRECT_URI")?,
      refresh_token: vars.required("REFRESH_TOKEN")?,
      auth_url: vars.or("OAUTH_AUTH_URL", crate::oauth::GOOGLE_AUTH_URL),
      token_url: vars.or("OAUTH_TOKEN_URL", crate::oauth::GOOGLE_TOKEN_URL),
    };

    let smtp = SmtpConfig {
      host: vars.or("SMTP_HOST", "smtp.gmail.com"),
      port: vars.parsed("SMTP_PORT", 587)?,
      username: sender_email.clone(),
    };

    let identity = MailIdentity {
      sender_name: vars.or("SENDER_NAME", DEFAULT_SENDER_NAME),
      recipient: vars.or("CONTACT_RECIPIENT", &sender_email),
      sender_email,
    };

    let defaults = RateLimitPolicy::default();
    let rate_limit = RateLimitPolicy {
      max_requests: vars.positive("RATE_LIMIT_MAX", defaults.max_requests)?,
      window: Duration::from_secs(vars.positive("RATE_LIMIT_WINDOW_SECS", defaults.window.as_secs())?),
      ..defaults
    };

    Ok(Self {
      port: vars.parsed("PORT", DEFAULT_PORT)?,
      oauth,
      smtp,
      identity,
      rate_limit,
      trust_proxy: vars.parsed("TRUST_PROXY", false)?,
    })
  }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
  F: Fn(&str) -> Option<String>,
{
  fn get(&self, key: &str) -> Option<String> {
    (self.0)(key).filter(|value| !value.trim().is_empty())
  }

  fn required(&self, key: &'static str) -> Result<String, ConfigError> {
    self.get(key).ok_or(ConfigError::Missing(key))
  }

  fn or(&self, key: &str, default: &str) -> String {
    self.get(key).unwrap_or_else(|| default.to_string())
  }

  fn parsed<T: std::str::FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
    match self.get(key) {
      Some(value) => value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value }),
      None => Ok(default),
    }
  }

  fn positive(&self, key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match self.parsed(key, default)? {
      0 => Err(ConfigError::Invalid {
        key,
        value: "0".to_string(),
      }),
      value => Ok(value),
    }
  }
}
