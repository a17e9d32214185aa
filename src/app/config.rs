use std::path::PathBuf;
use std::time::Duration;

use crate::app::{domain::Email, error::ConfigError};

/// Route intercepted when no endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "/mailgun";

/// Default Mailgun API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.mailgun.net";

/// Centralized environment configuration.
/// All env vars and defaults are defined here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Domain registered with the delivery provider. Required.
    pub domain: String,

    /// Provider API key. Required.
    pub api_key: String,

    /// Provider API base URL.
    /// Default: https://api.mailgun.net
    pub api_base: String,

    /// Route this middleware intercepts.
    /// Default: /mailgun
    pub endpoint: String,

    /// Sent-mail log destination: "", "stdout", "stderr" or a directory.
    pub mail_log: String,

    /// Error log destination: "", "stdout", "stderr" or a directory.
    pub error_log: String,

    /// Sender address used for every outgoing message.
    pub from_email: String,

    /// Sender display name.
    pub from_name: String,

    pub to: Vec<Email>,
    pub cc: Vec<Email>,
    pub bcc: Vec<Email>,

    /// Subject template source.
    pub subject: String,

    /// Path of the body template (.txt or .html).
    pub body_path: PathBuf,

    /// Rate limiter refill interval.
    /// Default: 24 hours
    pub rate_limit_interval: Duration,

    /// Rate limiter bucket capacity.
    /// Default: 1000
    pub rate_limit_capacity: u64,

    /// Site identities; the first one names the audit log files.
    pub hosts: Vec<String>,

    /// Delivery adapter: "mailgun", "smtp" or "console".
    /// Default: mailgun
    pub mail_adapter: String,

    /// SMTP host. Required when mail_adapter=smtp.
    pub smtp_host: Option<String>,

    /// SMTP port.
    /// Default: 587
    pub smtp_port: u16,

    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,

    /// Listen address for the standalone server.
    /// Default: 0.0.0.0:3000
    pub bind_addr: String,
}

impl Config {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset.
    /// Returns an error if required values are missing or any value is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let from_email = get("FROM_EMAIL").unwrap_or_default();
        if !from_email.is_empty() && Email::new(from_email.as_str()).is_err() {
            return Err(ConfigError::InvalidEmail {
                key: "FROM_EMAIL",
                value: from_email,
            });
        }

        let config = Self {
            domain: get("MAILGUN_DOMAIN").unwrap_or_default(),
            api_key: get("MAILGUN_PRIVATE_KEY").unwrap_or_default(),
            api_base: get("MAILGUN_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            endpoint: get("MAILGUN_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            mail_log: get("MAIL_LOG").unwrap_or_default(),
            error_log: get("ERROR_LOG").unwrap_or_default(),
            from_email,
            from_name: get("FROM_NAME").unwrap_or_default(),
            to: email_list("MAIL_TO", get("MAIL_TO"))?,
            cc: email_list("MAIL_CC", get("MAIL_CC"))?,
            bcc: email_list("MAIL_BCC", get("MAIL_BCC"))?,
            subject: get("MAIL_SUBJECT").unwrap_or_default(),
            body_path: PathBuf::from(get("MAIL_BODY").unwrap_or_default()),
            rate_limit_interval: Duration::from_secs(parse_number(
                "RATE_LIMIT_INTERVAL_SECS",
                get("RATE_LIMIT_INTERVAL_SECS"),
                24 * 60 * 60,
            )?),
            rate_limit_capacity: parse_number(
                "RATE_LIMIT_CAPACITY",
                get("RATE_LIMIT_CAPACITY"),
                1000,
            )?,
            hosts: get("SITE_HOSTS")
                .map(|hosts| {
                    hosts
                        .split(',')
                        .map(str::trim)
                        .filter(|h| !h.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            mail_adapter: get("MAIL_ADAPTER").unwrap_or_else(|| "mailgun".to_string()),
            smtp_host: get("SMTP_HOST"),
            smtp_port: parse_number("SMTP_PORT", get("SMTP_PORT"), 587)?,
            smtp_user: get("SMTP_USER"),
            smtp_pass: get("SMTP_PASS"),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let mut missing = Vec::with_capacity(2);
        if config.domain.is_empty() {
            missing.push("domain");
        }
        if config.api_key.is_empty() {
            missing.push("privatekey");
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingProperties(missing));
        }

        Ok(config)
    }

    /// Config for tests. Console adapter, discarding logs, no body template set.
    pub fn for_tests() -> Self {
        Self {
            domain: "example.com".to_string(),
            api_key: "key-test".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            mail_log: String::new(),
            error_log: String::new(),
            from_email: "noreply@example.com".to_string(),
            from_name: "Website".to_string(),
            to: Email::parse_list("team@example.com").unwrap_or_default(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: "Contact from {{ Form.email | first }}".to_string(),
            body_path: PathBuf::new(),
            rate_limit_interval: Duration::from_secs(24 * 60 * 60),
            rate_limit_capacity: 1000,
            hosts: vec!["localhost".to_string()],
            mail_adapter: "console".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_user: None,
            smtp_pass: None,
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }
}

fn email_list(key: &'static str, value: Option<String>) -> Result<Vec<Email>, ConfigError> {
    match value {
        Some(list) => {
            Email::parse_list(&list).map_err(|value| ConfigError::InvalidEmail { key, value })
        }
        None => Ok(Vec::new()),
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key,
            message: format!("{:?} is not a valid number", raw),
        }),
        None => Ok(default),
    }
}
