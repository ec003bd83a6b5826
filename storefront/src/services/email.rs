// storefront/src/services/email.rs

//! Outbound mail: the sender seam, a logging sender for local runs and the
//! order confirmation template.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

use crate::models::{CartLine, Order};
use crate::services::pricing::TotalBreakdown;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
  pub to: String,
  pub from: String,
  pub subject: String,
  pub html_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
  pub message_id: String,
}

#[derive(Debug, Error)]
pub enum EmailError {
  #[error("email rejected by provider: {0}")]
  Rejected(String),
  #[error("email transport failed: {0}")]
  Transport(String),
}

#[async_trait]
pub trait EmailSender: Send + Sync {
  async fn send(&self, message: &EmailMessage) -> Result<SentEmail, EmailError>;
}

/// Logs each message instead of delivering it.
#[derive(Debug, Clone)]
pub struct LoggingEmailSender {
  latency: Duration,
}

impl LoggingEmailSender {
  pub fn new() -> Self {
    Self {
      latency: Duration::from_millis(20),
    }
  }
}

impl Default for LoggingEmailSender {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl EmailSender for LoggingEmailSender {
  #[instrument(name = "LoggingEmailSender::send", skip_all, fields(to = %message.to, subject = %message.subject))]
  async fn send(&self, message: &EmailMessage) -> Result<SentEmail, EmailError> {
    tokio::time::sleep(self.latency).await;
    let message_id = format!("local_email_{}", uuid::Uuid::new_v4());
    let preview: String = message.html_body.chars().take(80).collect();
    info!(%message_id, from = %message.from, body_preview = %preview, "Email logged, not delivered.");
    Ok(SentEmail { message_id })
  }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingEmailSender {
  outbox: Mutex<Vec<EmailMessage>>,
}

impl RecordingEmailSender {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn sent(&self) -> Vec<EmailMessage> {
    self.outbox.lock().clone()
  }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
  async fn send(&self, message: &EmailMessage) -> Result<SentEmail, EmailError> {
    let mut outbox = self.outbox.lock();
    outbox.push(message.clone());
    Ok(SentEmail {
      message_id: format!("recorded_{}", outbox.len()),
    })
  }
}

pub struct OrderConfirmation<'a> {
  pub order: &'a Order,
  pub lines: &'a [CartLine],
  pub amounts: TotalBreakdown,
  pub tracking_page_url: &'a str,
}

pub fn confirmation_subject(order_code: &str) -> String {
  format!("Order Confirmation #{} - TARZIFY", order_code)
}

pub fn compose_order_confirmation(from: &str, to: &str, confirmation: &OrderConfirmation<'_>) -> EmailMessage {
  let order = confirmation.order;
  let rows: String = confirmation
    .lines
    .iter()
    .map(|line| {
      format!(
        "<tr><td>{}</td><td style=\"text-align:center\">{}</td><td style=\"text-align:right\">{}</td></tr>",
        escape_html(&line.display_name()),
        line.quantity,
        format_amount(line.line_total().unwrap_or_default())
      )
    })
    .collect();

  let html_body = format!(
    concat!(
      "<div style=\"font-family:Arial,sans-serif;max-width:600px;margin:0 auto\">",
      "<h1 style=\"color:#4f46e5\">TARZIFY</h1>",
      "<h2>Thank you for your order!</h2>",
      "<p>Order number: <strong>{code}</strong><br>Date: {date}<br>Payment: {payment}</p>",
      "<table style=\"width:100%;border-collapse:collapse\">",
      "<thead><tr><th style=\"text-align:left\">Item</th><th>Qty</th><th style=\"text-align:right\">Price</th></tr></thead>",
      "<tbody>{rows}</tbody></table>",
      "<p>Subtotal: {subtotal}<br>Shipping: {shipping}<br><strong>Total: {total}</strong></p>",
      "<h3>Shipping to</h3><p>{address}<br>{phone}</p>",
      "<p><a href=\"{tracking_url}\">Track your order</a> with code <strong>{code}</strong>.</p>",
      "</div>"
    ),
    code = escape_html(&order.order_code),
    date = order.created_at.format("%-d %B %Y"),
    payment = order.payment_method.label(),
    rows = rows,
    subtotal = format_amount(confirmation.amounts.subtotal),
    shipping = format_amount(confirmation.amounts.shipping),
    total = format_amount(confirmation.amounts.total),
    address = escape_html(&order.shipping_address),
    phone = escape_html(&order.phone),
    tracking_url = escape_html(confirmation.tracking_page_url),
  );

  EmailMessage {
    to: to.to_string(),
    from: from.to_string(),
    subject: confirmation_subject(&order.order_code),
    html_body,
  }
}

/// `Rs. 15,000`. Negative amounts keep their sign.
pub fn format_amount(amount: i64) -> String {
  let digits = amount.unsigned_abs().to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (idx, ch) in digits.chars().enumerate() {
    if idx > 0 && (digits.len() - idx) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(ch);
  }
  let sign = if amount < 0 { "-" } else { "" };
  format!("Rs. {sign}{grouped}")
}

fn escape_html(raw: &str) -> String {
  let mut escaped = String::with_capacity(raw.len());
  for ch in raw.chars() {
    match ch {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&#39;"),
      _ => escaped.push(ch),
    }
  }
  escaped
}
