use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, Tokio1Executor,
};

use super::{mailbox, Delivery, EmailError, EmailMessage, EmailProvider};
use crate::app::domain::Email;

/// SMTP email provider.
#[derive(Debug)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Create a new SMTP mailer.
    ///
    /// # Arguments
    /// * `host` - SMTP server hostname
    /// * `port` - SMTP server port (typically 587 for STARTTLS, 465 for TLS)
    /// * `user` - SMTP username (optional for some servers)
    /// * `pass` - SMTP password (optional for some servers)
    pub fn new(
        host: String,
        port: u16,
        user: Option<String>,
        pass: Option<String>,
    ) -> Result<Self, EmailError> {
        let mut transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&host)
            .port(port);

        // Add authentication if provided
        if let (Some(user), Some(pass)) = (user, pass) {
            let creds = Credentials::new(user, pass);
            transport = transport.credentials(creds);
        }

        let transport = transport.build();

        Ok(Self { transport })
    }
}

fn recipient(email: &Email) -> Result<Mailbox, EmailError> {
    email
        .as_str()
        .parse()
        .map_err(|e| EmailError::Config(format!("Invalid recipient '{}': {}", email, e)))
}

/// Build the lettre message for an outgoing email.
fn build(message: &EmailMessage) -> Result<Message, EmailError> {
    let mut builder = Message::builder()
        .from(mailbox(&message.from)?)
        .reply_to(mailbox(&message.reply_to)?)
        .subject(&message.subject);

    for to in &message.to {
        builder = builder.to(recipient(to)?);
    }
    for cc in &message.cc {
        builder = builder.cc(recipient(cc)?);
    }
    for bcc in &message.bcc {
        builder = builder.bcc(recipient(bcc)?);
    }

    let content_type = if message.html {
        ContentType::TEXT_HTML
    } else {
        ContentType::TEXT_PLAIN
    };

    builder
        .header(content_type)
        .body(message.body.clone())
        .map_err(|e| EmailError::Send(format!("Failed to build email message: {}", e)))
}

#[async_trait]
impl EmailProvider for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, EmailError> {
        let email = build(message)?;
        let id = email
            .headers()
            .get_raw("Message-ID")
            .unwrap_or_default()
            .to_string();

        let response = lettre::AsyncTransport::send(&self.transport, email)
            .await
            .map_err(|e| EmailError::Smtp(format!("SMTP send failed: {}", e)))?;

        Ok(Delivery {
            id,
            response: response.message().collect::<Vec<_>>().join(" "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::domain::Address;

    fn message(html: bool) -> EmailMessage {
        EmailMessage {
            from: Address::new("a@x.com", Some("Bob via Ann")),
            reply_to: Address::new("bob@y.com", Some("Bob")),
            to: Email::parse_list("x@a.com, y@b.com").unwrap(),
            cc: Email::parse_list("c@c.com").unwrap(),
            bcc: Vec::new(),
            subject: "Hello".to_string(),
            body: "<p>Hi</p>".to_string(),
            html,
        }
    }

    #[test]
    fn builds_headers_from_message() {
        let email = build(&message(true)).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("<a@x.com>"), "{raw}");
        assert!(raw.contains("Reply-To: Bob <bob@y.com>"), "{raw}");
        assert!(raw.contains("x@a.com") && raw.contains("y@b.com"), "{raw}");
        assert!(raw.contains("Cc: c@c.com"), "{raw}");
        assert!(raw.contains("Content-Type: text/html"), "{raw}");
    }

    #[test]
    fn plain_text_content_type() {
        let email = build(&message(false)).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("Content-Type: text/plain"), "{raw}");
    }
}
