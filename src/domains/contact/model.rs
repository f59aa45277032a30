use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::email::SendReceipt;

pub const MISSING_FIELDS_MESSAGE: &str = "Please provide name, email, and message.";
pub const SENT_MESSAGE: &str = "Email sent successfully!";

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SendEmailRequest {
  #[validate(required, length(min = 1))]
  pub name: Option<String>,
  #[validate(required, length(min = 1))]
  pub email: Option<String>,
  #[validate(required, length(min = 1))]
  pub message: Option<String>,
}

/// A validated contact-form submission. Lives for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
  pub name: String,
  pub email: String,
  pub message: String,
}

impl SendEmailRequest {
  pub fn into_submission(self) -> Option<Submission> {
    self.validate().ok()?;

    Some(Submission {
      name: self.name?,
      email: self.email?,
      message: self.message?,
    })
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendEmailResponse {
  pub message: String,
  pub result: SendReceipt,
}
