// storefront/src/services/smtp_mailer.rs

//! SMTP delivery of outbound mail, and the choice between SMTP and the
//! logging sender at start-up.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::{AppConfig, SmtpSettings};
use crate::errors::AppError;
use crate::services::email::{EmailError, EmailMessage, EmailSender, LoggingEmailSender, SentEmail};

const STARTTLS_PORT: u16 = 587;

pub struct SmtpEmailSender {
  transport: AsyncSmtpTransport<Tokio1Executor>,
  message_domain: String,
}

impl SmtpEmailSender {
  /// Builds the transport. No connection is made until the first send.
  pub fn new(settings: &SmtpSettings) -> Result<Self, AppError> {
    let builder = if settings.port == STARTTLS_PORT {
      AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
    } else {
      AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
    }
    .map_err(|e| AppError::Config(format!("Invalid SMTP host '{}': {}", settings.host, e)))?;

    let transport = builder
      .port(settings.port)
      .credentials(Credentials::new(settings.username.clone(), settings.password.clone()))
      .build();

    let message_domain = settings
      .username
      .rsplit_once('@')
      .map(|(_, domain)| domain.to_string())
      .unwrap_or_else(|| settings.host.clone());

    Ok(Self {
      transport,
      message_domain,
    })
  }
}

/// Turns an outbound message into a MIME message with an HTML body.
pub fn build_message(message: &EmailMessage, message_id: &str) -> Result<Message, EmailError> {
  let from: Mailbox = message
    .from
    .parse()
    .map_err(|e| EmailError::Rejected(format!("bad sender '{}': {}", message.from, e)))?;
  let to: Mailbox = message
    .to
    .parse()
    .map_err(|e| EmailError::Rejected(format!("bad recipient '{}': {}", message.to, e)))?;

  Message::builder()
    .from(from)
    .to(to)
    .subject(message.subject.as_str())
    .message_id(Some(message_id.to_string()))
    .header(ContentType::TEXT_HTML)
    .body(message.html_body.clone())
    .map_err(|e| EmailError::Rejected(e.to_string()))
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
  #[instrument(name = "SmtpEmailSender::send", skip_all, fields(to = %message.to, subject = %message.subject))]
  async fn send(&self, message: &EmailMessage) -> Result<SentEmail, EmailError> {
    let message_id = format!("<{}@{}>", uuid::Uuid::new_v4(), self.message_domain);
    let mime = build_message(message, &message_id)?;

    let response = self.transport.send(mime).await.map_err(|e| {
      if e.is_permanent() {
        EmailError::Rejected(e.to_string())
      } else {
        EmailError::Transport(e.to_string())
      }
    })?;
    info!(%message_id, code = %response.code(), "Email delivered to SMTP relay.");
    Ok(SentEmail { message_id })
  }
}

/// SMTP when configured, otherwise the logging sender.
pub fn mailer_from_config(config: &AppConfig) -> Result<Arc<dyn EmailSender>, AppError> {
  match &config.smtp {
    Some(settings) => {
      info!(host = %settings.host, port = settings.port, "Confirmation emails go out over SMTP.");
      Ok(Arc::new(SmtpEmailSender::new(settings)?))
    }
    None => {
      warn!("No SMTP account configured, confirmation emails are logged only.");
      Ok(Arc::new(LoggingEmailSender::new()))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn confirmation() -> EmailMessage {
    EmailMessage {
      to: "buyer@example.com".to_string(),
      from: "\"TARZIFY\" <order@tarzify.com>".to_string(),
      subject: "Order Confirmation #AB123456 - TARZIFY".to_string(),
      html_body: "<p>Total: Rs. 15,000</p>".to_string(),
    }
  }

  #[test]
  fn confirmation_becomes_an_html_mime_message() {
    let mime = build_message(&confirmation(), "<m1@tarzify.com>").unwrap();
    let raw = String::from_utf8(mime.formatted()).unwrap();
    assert!(raw.contains("Subject: Order Confirmation #AB123456 - TARZIFY"));
    assert!(raw.contains("Content-Type: text/html; charset=utf-8"));
    assert!(raw.contains("Message-ID: <m1@tarzify.com>"));
    assert!(raw.contains("To: buyer@example.com"));
  }

  #[test]
  fn unparseable_recipient_is_rejected() {
    let mut message = confirmation();
    message.to = "not an address".to_string();
    assert!(matches!(build_message(&message, "<m2@tarzify.com>"), Err(EmailError::Rejected(_))));
  }

  #[tokio::test]
  async fn missing_smtp_settings_fall_back_to_logging() {
    let config = AppConfig::with_database_url("postgres://unused");
    let mailer = mailer_from_config(&config).unwrap();
    let sent = mailer.send(&confirmation()).await.unwrap();
    assert!(sent.message_id.starts_with("local_email_"));
  }

  #[tokio::test]
  async fn smtp_settings_build_a_transport_without_connecting() {
    let mut config = AppConfig::with_database_url("postgres://unused");
    config.smtp = Some(SmtpSettings {
      host: "smtp.example.com".to_string(),
      port: 465,
      username: "order@tarzify.com".to_string(),
      password: "secret".to_string(),
    });
    assert!(mailer_from_config(&config).is_ok());
  }
}
