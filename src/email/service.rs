use async_trait::async_trait;
use lettre::{
  message::{Mailbox, MultiPart},
  transport::smtp::authentication::{Credentials, Mechanism},
  Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use super::{
  error::MailError,
  types::{ContactEmail, Envelope, SendReceipt, SmtpConfig},
};
use crate::oauth::AccessToken;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
  /// Open a session authenticated with `access_token` and submit one message.
  async fn send(&self, access_token: &AccessToken, email: ContactEmail) -> Result<SendReceipt, MailError>;
}

pub struct SmtpMailer {
  smtp_config: SmtpConfig,
}

impl SmtpMailer {
  pub fn new(smtp_config: SmtpConfig) -> Self {
    SmtpMailer { smtp_config }
  }

  fn transport(&self, access_token: &AccessToken) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let creds = Credentials::new(self.smtp_config.username.clone(), access_token.secret().to_string());

    let transport = if self.smtp_config.host == "localhost" || self.smtp_config.host == "mailhog" {
      AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.smtp_config.host)
        .credentials(creds)
        .authentication(vec![Mechanism::Xoauth2])
        .port(self.smtp_config.port)
        .build()
    } else {
      AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_config.host)
        .map_err(|e| MailError::Connection(e.to_string()))?
        .credentials(creds)
        .authentication(vec![Mechanism::Xoauth2])
        .port(self.smtp_config.port)
        .build()
    };

    Ok(transport)
  }
}

#[async_trait]
impl MailTransport for SmtpMailer {
  async fn send(&self, access_token: &AccessToken, email: ContactEmail) -> Result<SendReceipt, MailError> {
    let (message, message_id) = build_message(&email)?;
    let envelope = message.envelope().clone();

    let transport = self.transport(access_token)?;
    let response = transport
      .send(message)
      .await
      .map_err(|e| MailError::Send(e.to_string()))?;

    let recipients: Vec<String> = envelope.to().iter().map(ToString::to_string).collect();
    let reply = response.message().collect::<Vec<_>>().join(" ");

    info!(message_id = %message_id, "Email accepted by {}", self.smtp_config.host);

    Ok(SendReceipt {
      message_id,
      accepted: recipients.clone(),
      rejected: Vec::new(),
      envelope: Envelope {
        from: envelope.from().map(ToString::to_string).unwrap_or_default(),
        to: recipients,
      },
      response: format!("{} {}", response.code(), reply).trim_end().to_string(),
    })
  }
}

/// Convert a composed notification into a lettre message, returning the
/// Message-ID that was assigned to it.
pub(crate) fn build_message(email: &ContactEmail) -> Result<(Message, String), MailError> {
  let from_address: Address = email
    .from
    .parse()
    .map_err(|_| MailError::InvalidAddress(email.from.clone()))?;
  let to: Mailbox = email
    .to
    .parse()
    .map_err(|_| MailError::InvalidAddress(email.to.clone()))?;

  let message_id = format!("<{}@{}>", uuid::Uuid::new_v4(), from_address.domain());

  let mut builder = Message::builder()
    .from(Mailbox::new(Some(email.from_name.clone()), from_address))
    .to(to)
    .subject(email.subject.clone())
    .message_id(Some(message_id.clone()));

  // The submitter's address is only a convenience for replying.
  if let Some(reply_to) = email.reply_to.as_deref().and_then(|addr| addr.parse::<Mailbox>().ok()) {
    builder = builder.reply_to(reply_to);
  }

  let message = builder
    .multipart(MultiPart::alternative_plain_html(
      email.text_body.clone(),
      email.html_body.clone(),
    ))
    .map_err(|e| MailError::MessageBuild(e.to_string()))?;

  Ok((message, message_id))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpListener,
    task::JoinHandle,
  };

  // base64("user=owner@example.com\x01auth=Bearer ya29.test\x01\x01")
  const XOAUTH2_INITIAL_RESPONSE: &str = "dXNlcj1vd25lckBleGFtcGxlLmNvbQFhdXRoPUJlYXJlciB5YTI5LnRlc3QBAQ==";

  /// Minimal SMTP peer for one session; returns the command lines it received.
  async fn fake_smtp_server() -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
      let (stream, _) = listener.accept().await.unwrap();
      let (read, mut write) = stream.into_split();
      let mut lines = BufReader::new(read).lines();
      let mut commands = Vec::new();

      write.write_all(b"220 localhost ESMTP\r\n").await.unwrap();

      while let Ok(Some(line)) = lines.next_line().await {
        let verb = line.split(' ').next().unwrap_or_default().to_ascii_uppercase();
        commands.push(line);

        let reply: &[u8] = match verb.as_str() {
          "EHLO" => b"250-localhost\r\n250 AUTH XOAUTH2\r\n",
          "AUTH" => b"235 2.7.0 Accepted\r\n",
          "MAIL" | "RCPT" => b"250 2.1.0 OK\r\n",
          "DATA" => {
            write.write_all(b"354 Go ahead\r\n").await.unwrap();
            while let Ok(Some(body)) = lines.next_line().await {
              if body == "." {
                break;
              }
            }
            b"250 2.0.0 OK queued\r\n"
          }
          "QUIT" => {
            let _ = write.write_all(b"221 2.0.0 Bye\r\n").await;
            break;
          }
          _ => b"502 5.5.2 Unrecognized command\r\n",
        };
        write.write_all(reply).await.unwrap();
      }

      commands
    });

    (port, handle)
  }

  fn contact_email() -> ContactEmail {
    ContactEmail {
      from_name: "Contact Form".to_string(),
      from: "owner@example.com".to_string(),
      to: "inbox@example.com".to_string(),
      reply_to: Some("ann@x.com".to_string()),
      subject: "New message from Ann".to_string(),
      text_body: "You have received a new message from Ann (ann@x.com):\n\nHi".to_string(),
      html_body: "<p>Hi</p>".to_string(),
    }
  }

  #[test]
  fn test_build_message_headers() {
    let (message, message_id) = build_message(&contact_email()).unwrap();
    let formatted = String::from_utf8(message.formatted()).unwrap();

    assert!(message_id.ends_with("@example.com>"));
    assert!(formatted.contains("Subject: New message from Ann"));
    assert!(formatted.contains("Reply-To: ann@x.com"));
    assert!(formatted.contains("multipart/alternative"));
    assert!(formatted.contains(&format!("Message-ID: {}", message_id)));
    assert_eq!(message.envelope().to()[0].to_string(), "inbox@example.com");
  }

  #[test]
  fn test_build_message_skips_unparsable_reply_to() {
    let mut email = contact_email();
    email.reply_to = Some("not an address".to_string());

    let (message, _) = build_message(&email).unwrap();
    let formatted = String::from_utf8(message.formatted()).unwrap();

    assert!(!formatted.contains("Reply-To"));
  }

  #[test]
  fn test_build_message_rejects_bad_sender() {
    let mut email = contact_email();
    email.from = "nobody".to_string();

    assert!(matches!(build_message(&email), Err(MailError::InvalidAddress(_))));
  }

  #[tokio::test]
  async fn test_transport_for_localhost_smtp() {
    let mailer = SmtpMailer::new(SmtpConfig {
      host: "localhost".to_string(),
      port: 1025,
      username: "owner@example.com".to_string(),
    });

    let token = AccessToken::new("ya29.test", None);
    assert!(mailer.transport(&token).is_ok());
    assert_eq!(mailer.smtp_config.port, 1025);
  }

  #[tokio::test]
  async fn test_transport_for_remote_smtp() {
    let mailer = SmtpMailer::new(SmtpConfig::default());

    let token = AccessToken::new("ya29.test", None);
    assert!(mailer.transport(&token).is_ok());
    assert_eq!(mailer.smtp_config.host, "smtp.gmail.com");
  }

  #[tokio::test]
  async fn test_send_authenticates_with_xoauth2_and_reports_receipt() {
    let (port, server) = fake_smtp_server().await;
    let mailer = SmtpMailer::new(SmtpConfig {
      host: "localhost".to_string(),
      port,
      username: "owner@example.com".to_string(),
    });

    let receipt = mailer
      .send(&AccessToken::new("ya29.test", None), contact_email())
      .await
      .unwrap();
    let commands = server.await.unwrap();

    let auth = commands
      .iter()
      .find(|line| line.starts_with("AUTH "))
      .expect("AUTH command sent");
    assert_eq!(auth, &format!("AUTH XOAUTH2 {}", XOAUTH2_INITIAL_RESPONSE));
    assert!(commands.iter().any(|line| line.starts_with("MAIL FROM:<owner@example.com>")));
    assert!(commands.iter().any(|line| line.starts_with("RCPT TO:<inbox@example.com>")));
    assert_eq!(commands.iter().filter(|line| line.as_str() == "DATA").count(), 1);

    assert!(receipt.message_id.starts_with('<'));
    assert!(receipt.message_id.ends_with("@example.com>"));
    assert_eq!(receipt.accepted, vec!["inbox@example.com".to_string()]);
    assert!(receipt.rejected.is_empty());
    assert_eq!(
      receipt.envelope,
      Envelope {
        from: "owner@example.com".to_string(),
        to: vec!["inbox@example.com".to_string()],
      }
    );
    assert_eq!(receipt.response, "250 2.0.0 OK queued");
  }

  #[tokio::test]
  async fn test_send_surfaces_rejected_authentication() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
      let (stream, _) = listener.accept().await.unwrap();
      let (read, mut write) = stream.into_split();
      let mut lines = BufReader::new(read).lines();

      write.write_all(b"220 localhost ESMTP\r\n").await.unwrap();
      while let Ok(Some(line)) = lines.next_line().await {
        let reply: &[u8] = if line.starts_with("EHLO") {
          b"250-localhost\r\n250 AUTH XOAUTH2\r\n"
        } else if line.starts_with("AUTH") {
          b"535 5.7.8 Username and Password not accepted\r\n"
        } else {
          b"221 2.0.0 Bye\r\n"
        };
        if write.write_all(reply).await.is_err() {
          break;
        }
      }
    });

    let mailer = SmtpMailer::new(SmtpConfig {
      host: "localhost".to_string(),
      port,
      username: "owner@example.com".to_string(),
    });
    let err = mailer
      .send(&AccessToken::new("ya29.stale", None), contact_email())
      .await
      .unwrap_err();
    server.abort();

    assert!(matches!(err, MailError::Send(_)));
    assert!(err.to_string().contains("535"));
  }
}
