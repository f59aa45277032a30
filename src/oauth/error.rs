use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
  /// The refresh token was revoked or expired; an operator has to
  /// authorize the application again.
  #[error("invalid_grant: {0}")]
  InvalidGrant(String),

  #[error("Token endpoint rejected the request: {0}")]
  Rejected(String),

  #[error("Token request failed: {0}")]
  Request(String),

  #[error("Invalid OAuth2 configuration: {0}")]
  InvalidConfig(String),
}

impl TokenError {
  pub fn is_invalid_grant(&self) -> bool {
    matches!(self, TokenError::InvalidGrant(_))
  }
}
