// storefront/src/config.rs

use crate::errors::{AppError, Result};
use crate::services::fulfillment::StatusPolicy;
use crate::services::pricing::{ShippingRates, TotalCheck};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
  #[default]
  Pretty,
  Json,
}

impl FromStr for LogFormat {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "pretty" => Ok(LogFormat::Pretty),
      "json" => Ok(LogFormat::Json),
      other => Err(AppError::Config(format!("LOG_FORMAT must be pretty or json (got '{}')", other))),
    }
  }
}

/// Outbound SMTP account. Port 587 uses STARTTLS, any other port implicit TLS.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
  pub host: String,
  pub port: u16,
  pub username: String,
  pub password: String,
}

impl std::fmt::Debug for SmtpSettings {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SmtpSettings")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("username", &self.username)
      .finish_non_exhaustive()
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub db_max_connections: u32,
  pub run_migrations: bool,
  pub seed_db: bool,

  pub email_sender: String,
  pub tracking_page_url: String,
  /// `None` means confirmations are logged instead of delivered.
  pub smtp: Option<SmtpSettings>,

  pub shipping_rates: ShippingRates,
  pub total_check: TotalCheck,
  pub status_policy: StatusPolicy,
  /// Bound on every call to the store, the mail sender and the stock ledger.
  pub external_call_timeout: Duration,

  pub log_format: LogFormat,
}

impl AppConfig {
  /// Defaults for everything except the database URL.
  pub fn with_database_url(database_url: impl Into<String>) -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: database_url.into(),
      db_max_connections: 10,
      run_migrations: true,
      seed_db: false,
      email_sender: "\"TARZIFY\" <order@tarzify.com>".to_string(),
      tracking_page_url: "https://tarzify.com/#track-order".to_string(),
      smtp: None,
      shipping_rates: ShippingRates::default(),
      total_check: TotalCheck::default(),
      status_policy: StatusPolicy::default(),
      external_call_timeout: Duration::from_millis(5000),
      log_format: LogFormat::default(),
    }
  }

  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source; `from_env` passes the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let database_url = lookup("DATABASE_URL")
      .filter(|v| !v.trim().is_empty())
      .ok_or_else(|| AppError::Config("Missing environment variable 'DATABASE_URL'".to_string()))?;
    let mut config = Self::with_database_url(database_url);

    if let Some(host) = lookup("SERVER_HOST") {
      config.server_host = host;
    }
    config.server_port = parse_var(&lookup, "SERVER_PORT", config.server_port)?;
    config.db_max_connections = parse_var(&lookup, "DB_MAX_CONNECTIONS", config.db_max_connections)?;
    config.run_migrations = parse_var(&lookup, "RUN_MIGRATIONS", config.run_migrations)?;
    config.seed_db = parse_var(&lookup, "SEED_DB", config.seed_db)?;

    config.smtp = smtp_settings(&lookup)?;
    match lookup("SMTP_FROM").or_else(|| lookup("EMAIL_SENDER")) {
      Some(sender) => config.email_sender = sender,
      None => {
        if let Some(smtp) = &config.smtp {
          config.email_sender = format!("\"TARZIFY\" <{}>", smtp.username);
        }
      }
    }
    if let Some(url) = lookup("TRACKING_PAGE_URL") {
      config.tracking_page_url = url;
    }

    let fastpay = parse_var(&lookup, "SHIPPING_RATE_FASTPAY", 250i64)?;
    let cod = parse_var(&lookup, "SHIPPING_RATE_COD", 300i64)?;
    if fastpay < 0 || cod < 0 {
      return Err(AppError::Config("Shipping rates cannot be negative".to_string()));
    }
    config.shipping_rates = ShippingRates::new(fastpay, cod);

    if let Some(mode) = lookup("ORDER_TOTAL_CHECK") {
      config.total_check = mode.parse()?;
    }
    if let Some(policy) = lookup("ORDER_STATUS_POLICY") {
      config.status_policy = policy.parse()?;
    }

    let timeout_ms = parse_var(&lookup, "EXTERNAL_CALL_TIMEOUT_MS", 5000u64)?;
    if timeout_ms == 0 {
      return Err(AppError::Config("EXTERNAL_CALL_TIMEOUT_MS must be positive".to_string()));
    }
    config.external_call_timeout = Duration::from_millis(timeout_ms);

    if let Some(format) = lookup("LOG_FORMAT") {
      config.log_format = format.parse()?;
    }

    tracing::info!(
      smtp = config.smtp.is_some(),
      total_check = %config.total_check,
      status_policy = ?config.status_policy,
      external_call_timeout_ms = timeout_ms,
      "Application configuration loaded successfully."
    );
    Ok(config)
  }
}

/// SMTP is enabled only when both `SMTP_USER` and `SMTP_PASS` are set.
fn smtp_settings(lookup: &impl Fn(&str) -> Option<String>) -> Result<Option<SmtpSettings>> {
  let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
  let (username, password) = match (present("SMTP_USER"), present("SMTP_PASS")) {
    (Some(user), Some(pass)) => (user, pass),
    (None, None) => {
      tracing::warn!("SMTP credentials missing, confirmation emails will only be logged.");
      return Ok(None);
    }
    _ => {
      tracing::warn!("Only one of SMTP_USER and SMTP_PASS is set, confirmation emails will only be logged.");
      return Ok(None);
    }
  };

  Ok(Some(SmtpSettings {
    host: present("SMTP_HOST").unwrap_or_else(|| "smtp.hostinger.com".to_string()),
    port: parse_var(lookup, "SMTP_PORT", 465u16)?,
    username,
    password,
  }))
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match lookup(name) {
    Some(raw) => raw
      .trim()
      .parse()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e))),
    None => Ok(default),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::PaymentMethod;
  use std::collections::HashMap;

  fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| map.get(name).cloned()
  }

  #[test]
  fn defaults_apply_when_only_the_database_is_set() {
    let config = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/tarzify")])).unwrap();
    assert_eq!(config.server_port, 8080);
    assert_eq!(config.total_check, TotalCheck::Warn);
    assert!(matches!(config.status_policy, StatusPolicy::Permissive));
    assert_eq!(config.shipping_rates.rate_for(PaymentMethod::Cod), Some(300));
    assert_eq!(config.external_call_timeout, Duration::from_secs(5));
    assert!(config.run_migrations);
  }

  #[test]
  fn database_url_is_required() {
    let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
    assert!(matches!(err, AppError::Config(m) if m.contains("DATABASE_URL")));
  }

  #[test]
  fn overrides_are_parsed() {
    let config = AppConfig::from_lookup(lookup_from(&[
      ("DATABASE_URL", "postgres://db/tarzify"),
      ("SERVER_PORT", "9090"),
      ("ORDER_TOTAL_CHECK", "Enforce"),
      ("ORDER_STATUS_POLICY", "monotonic"),
      ("SHIPPING_RATE_FASTPAY", "0"),
      ("EXTERNAL_CALL_TIMEOUT_MS", "250"),
      ("LOG_FORMAT", "json"),
    ]))
    .unwrap();
    assert_eq!(config.server_port, 9090);
    assert_eq!(config.total_check, TotalCheck::Enforce);
    assert!(matches!(config.status_policy, StatusPolicy::Monotonic));
    assert_eq!(config.shipping_rates.rate_for(PaymentMethod::FastPay), Some(0));
    assert_eq!(config.external_call_timeout, Duration::from_millis(250));
    assert_eq!(config.log_format, LogFormat::Json);
  }

  #[test]
  fn smtp_needs_both_credentials() {
    let config = AppConfig::from_lookup(lookup_from(&[
      ("DATABASE_URL", "postgres://db"),
      ("SMTP_USER", "order@tarzify.com"),
    ]))
    .unwrap();
    assert!(config.smtp.is_none());
    assert_eq!(config.email_sender, "\"TARZIFY\" <order@tarzify.com>");
  }

  #[test]
  fn smtp_settings_default_host_port_and_sender() {
    let config = AppConfig::from_lookup(lookup_from(&[
      ("DATABASE_URL", "postgres://db"),
      ("SMTP_USER", "mailer@shop.pk"),
      ("SMTP_PASS", "s3cret"),
    ]))
    .unwrap();
    let smtp = config.smtp.clone().unwrap();
    assert_eq!(smtp.host, "smtp.hostinger.com");
    assert_eq!(smtp.port, 465);
    assert_eq!(config.email_sender, "\"TARZIFY\" <mailer@shop.pk>");
    assert!(!format!("{:?}", smtp).contains("s3cret"));

    let config = AppConfig::from_lookup(lookup_from(&[
      ("DATABASE_URL", "postgres://db"),
      ("SMTP_HOST", "mail.example.com"),
      ("SMTP_PORT", "587"),
      ("SMTP_USER", "mailer@shop.pk"),
      ("SMTP_PASS", "s3cret"),
      ("SMTP_FROM", "Shop <noreply@shop.pk>"),
    ]))
    .unwrap();
    assert_eq!(config.smtp.as_ref().map(|s| s.port), Some(587));
    assert_eq!(config.email_sender, "Shop <noreply@shop.pk>");
  }

  #[test]
  fn bad_values_are_config_errors() {
    for (name, value) in [
      ("SERVER_PORT", "eighty"),
      ("ORDER_TOTAL_CHECK", "maybe"),
      ("EXTERNAL_CALL_TIMEOUT_MS", "0"),
      ("SHIPPING_RATE_COD", "-1"),
    ] {
      let result = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://db"), (name, value)]));
      assert!(matches!(result, Err(AppError::Config(_))), "{name}={value} should be rejected");
    }
  }
}
