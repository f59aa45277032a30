use htmlescape::encode_minimal;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
  pub host: String,
  pub port: u16,
  pub username: String,
}

impl Default for SmtpConfig {
  fn default() -> Self {
    SmtpConfig {
      host: "smtp.gmail.com".to_string(),
      port: 587,
      username: "".to_string(),
    }
  }
}

/// Who the notification comes from and where it goes.
#[derive(Debug, Clone)]
pub struct MailIdentity {
  pub sender_name: String,
  pub sender_email: String,
  pub recipient: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEmail {
  pub from_name: String,
  pub from: String,
  pub to: String,
  pub reply_to: Option<String>,
  pub subject: String,
  pub text_body: String,
  pub html_body: String,
}

impl ContactEmail {
  /// Build the notification for one submission. Subject and plain-text body
  /// carry the fields as given; the HTML body escapes them.
  pub fn compose(identity: &MailIdentity, name: &str, email: &str, message: &str) -> Self {
    ContactEmail {
      from_name: identity.sender_name.clone(),
      from: identity.sender_email.clone(),
      to: identity.recipient.clone(),
      reply_to: Some(email.to_string()),
      subject: format!("New message from {}", name),
      text_body: format!("You have received a new message from {} ({}):\n\n{}", name, email, message),
      html_body: render_html(&identity.sender_name, name, email, message),
    }
  }
}

fn render_html(signature: &str, name: &str, email: &str, message: &str) -> String {
  format!(
    r#"<div style="font-family: Arial, sans-serif; color: #333; margin: 0; padding: 20px; background-color: #f4f4f4;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px; background-color: #ffffff; border-radius: 4px;">
    <h2 style="margin-bottom: 20px;">You have received a new message:</h2>
    <p><strong>Name:</strong> {name}</p>
    <p><strong>Email:</strong> {email}</p>
    <p><strong>Message:</strong></p>
    <p>{message}</p>
    <p style="font-size: 14px; color: #777; text-align: center; margin-top: 20px;">
      Best regards,<br>
      {signature}
    </p>
  </div>
</div>
"#,
    name = encode_minimal(name),
    email = encode_minimal(email),
    message = encode_minimal(message).replace('\n', "<br>\n"),
    signature = encode_minimal(signature),
  )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
  pub from: String,
  pub to: Vec<String>,
}

/// What the provider reported for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
  pub message_id: String,
  pub accepted: Vec<String>,
  pub rejected: Vec<String>,
  pub envelope: Envelope,
  pub response: String,
}
