use async_trait::async_trait;
use ulid::Ulid;

use super::{Delivery, EmailError, EmailMessage, EmailProvider};

/// Console email provider for local development.
/// Logs email details to the terminal using tracing::info!.
#[derive(Debug)]
pub struct ConsoleMailer;

#[async_trait]
impl EmailProvider for ConsoleMailer {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, EmailError> {
        let id = Ulid::new().to_string();
        let to: Vec<&str> = message.to.iter().map(|e| e.as_str()).collect();

        tracing::info!(
            %id,
            to = %to.join(", "),
            from = %message.from,
            reply_to = %message.reply_to,
            subject = %message.subject,
            body = %message.body,
            html = message.html,
            "Email sent (console)"
        );

        Ok(Delivery {
            id,
            response: "Logged to console".to_string(),
        })
    }
}
