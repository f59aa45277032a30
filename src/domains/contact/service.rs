use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use super::model::Submission;
use crate::{
  email::{ContactEmail, MailError, MailIdentity, MailTransport, SendReceipt},
  oauth::{OAuthClient, TokenError},
};

#[derive(Debug, Error)]
pub enum ContactServiceError {
  #[error(transparent)]
  Token(#[from] TokenError),

  #[error(transparent)]
  Mail(#[from] MailError),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactService: Send + Sync {
  async fn send_contact_email(&self, submission: Submission) -> Result<SendReceipt, ContactServiceError>;
}

pub struct ContactServiceImpl<O, T> {
  oauth_client: O,
  transport: T,
  identity: MailIdentity,
}

impl<O, T> ContactServiceImpl<O, T>
where
  O: OAuthClient,
  T: MailTransport,
{
  pub fn new(oauth_client: O, transport: T, identity: MailIdentity) -> Self {
    Self {
      oauth_client,
      transport,
      identity,
    }
  }

  fn prompt_reauthentication(&self) {
    let auth_url = self.oauth_client.authorization_url();
    warn!(%auth_url, "Please re-authenticate by visiting this URL");
  }
}

#[async_trait]
impl<O, T> ContactService for ContactServiceImpl<O, T>
where
  O: OAuthClient,
  T: MailTransport,
{
  async fn send_contact_email(&self, submission: Submission) -> Result<SendReceipt, ContactServiceError> {
    let email = ContactEmail::compose(
      &self.identity,
      &submission.name,
      &submission.email,
      &submission.message,
    );

    let access_token = match self.oauth_client.access_token().await {
      Ok(token) => token,
      Err(e) => {
        if e.is_invalid_grant() {
          self.prompt_reauthentication();
        }
        return Err(e.into());
      }
    };

    let receipt = self.transport.send(&access_token, email).await?;
    info!(message_id = %receipt.message_id, "Contact email from {} delivered", submission.email);

    Ok(receipt)
  }
}
