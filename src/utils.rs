pub mod error;

use crate::{
  config::AppConfig,
  domains::contact::service::ContactServiceImpl,
  email::SmtpMailer,
  oauth::GoogleOAuthClient,
};

pub type GmailContactService = ContactServiceImpl<GoogleOAuthClient, SmtpMailer>;

pub fn init_contact_service(config: &AppConfig) -> anyhow::Result<GmailContactService> {
  let oauth_client = GoogleOAuthClient::new(&config.oauth)?;
  let mailer = SmtpMailer::new(config.smtp.clone());

  Ok(ContactServiceImpl::new(oauth_client, mailer, config.identity.clone()))
}
