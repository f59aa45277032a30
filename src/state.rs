use std::sync::Arc;

use crate::{
  config::AppConfig,
  domains::contact::{
    model::Submission,
    service::{ContactService, ContactServiceError},
  },
  email::SendReceipt,
  middleware::rate_limit::RateLimitState,
  utils::init_contact_service,
};

pub trait AppState: Clone + Send + Sync + 'static {
  fn send_contact_email(
    &self,
    submission: Submission,
  ) -> impl std::future::Future<Output = Result<SendReceipt, ContactServiceError>> + Send;
}

#[derive(Clone)]
pub struct SharedAppState {
  pub contact_service: Arc<dyn ContactService>,
  pub rate_limit: RateLimitState,
}

impl SharedAppState {
  pub fn new(contact_service: Arc<dyn ContactService>, rate_limit: RateLimitState) -> Self {
    Self {
      contact_service,
      rate_limit,
    }
  }

  pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
    let contact_service = Arc::new(init_contact_service(config)?);
    let rate_limit = RateLimitState::in_memory(&config.rate_limit, config.trust_proxy);

    Ok(Self::new(contact_service, rate_limit))
  }
}

impl AppState for SharedAppState {
  async fn send_contact_email(&self, submission: Submission) -> Result<SendReceipt, ContactServiceError> {
    self.contact_service.send_contact_email(submission).await
  }
}
