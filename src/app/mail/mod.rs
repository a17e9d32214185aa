use std::sync::Arc;

use lettre::message::Mailbox;

use crate::app::{compose::Message, domain::{Address, Email}};

/// Message handed to a provider: the composed content plus the configured envelope.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from: Address,
    pub reply_to: Address,
    pub to: Vec<Email>,
    pub cc: Vec<Email>,
    pub bcc: Vec<Email>,
    pub subject: String,
    pub body: String,
    /// Body is HTML rather than plain text.
    pub html: bool,
}

impl EmailMessage {
    /// Address a composed message to the configured recipients.
    pub fn new(message: &Message, config: &crate::app::config::Config, html: bool) -> Self {
        Self {
            from: message.from.clone(),
            reply_to: message.reply_to.clone(),
            to: config.to.clone(),
            cc: config.cc.clone(),
            bcc: config.bcc.clone(),
            subject: message.subject.clone(),
            body: message.body.clone(),
            html,
        }
    }
}

/// What the provider reported for an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub id: String,
    pub response: String,
}

/// Abstract interface for delivering email. Swappable per environment.
#[async_trait::async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, EmailError>;
}

/// Errors that can occur during email sending.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Send error: {0}")]
    Send(String),
    #[error("Delivery timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Header form of an address. The display name is quoted whenever it is
/// not a plain atom, so a submitted name cannot add mailboxes.
pub(crate) fn mailbox(address: &Address) -> Result<Mailbox, EmailError> {
    let email = address
        .email
        .parse()
        .map_err(|e| EmailError::Config(format!("Invalid address '{}': {}", address.email, e)))?;
    Ok(Mailbox::new(address.name.clone(), email))
}

// Re-export implementations
pub use console::ConsoleMailer;
pub use mailgun::MailgunMailer;
pub use smtp::SmtpMailer;

mod console;
mod mailgun;
mod smtp;

/// Build the email provider from config.
pub fn from_config(config: &crate::app::config::Config) -> Result<Arc<dyn EmailProvider>, EmailError> {
    match config.mail_adapter.as_str() {
        "mailgun" => Ok(Arc::new(MailgunMailer::new(
            config.api_base.clone(),
            config.domain.clone(),
            config.api_key.clone(),
        )?)),
        "console" => Ok(Arc::new(ConsoleMailer)),
        "smtp" => {
            let host = config
                .smtp_host
                .clone()
                .ok_or_else(|| EmailError::Config("SMTP_HOST is required for SMTP adapter".to_string()))?;

            Ok(Arc::new(SmtpMailer::new(
                host,
                config.smtp_port,
                config.smtp_user.clone(),
                config.smtp_pass.clone(),
            )?))
        }
        _ => Err(EmailError::Config(format!(
            "Unknown MAIL_ADAPTER: {}",
            config.mail_adapter
        ))),
    }
}
