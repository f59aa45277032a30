//! Email sending functionality module
//!
//! Composes the contact notification and submits it over SMTP with lettre,
//! authenticating with an OAuth2 access token (XOAUTH2).

mod error;
mod service;
mod types;

pub use error::MailError;
pub use service::{MailTransport, SmtpMailer};
pub use types::{ContactEmail, Envelope, MailIdentity, SendReceipt, SmtpConfig};

#[cfg(test)]
pub use service::MockMailTransport;
