use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
  #[error("Invalid email address: {0}")]
  InvalidAddress(String),

  #[error("Failed to build message: {0}")]
  MessageBuild(String),

  #[error("Failed to connect to SMTP server: {0}")]
  Connection(String),

  #[error("Failed to send message: {0}")]
  Send(String),
}
