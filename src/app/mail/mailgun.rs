use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{mailbox, Delivery, EmailError, EmailMessage, EmailProvider};

/// Mailgun HTTP API provider.
#[derive(Debug, Clone)]
pub struct MailgunMailer {
    client: Client,
    url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    message: String,
}

impl MailgunMailer {
    /// Create a mailer posting to `{api_base}/v3/{domain}/messages`.
    pub fn new(api_base: String, domain: String, api_key: String) -> Result<Self, EmailError> {
        if domain.trim().is_empty() || api_key.trim().is_empty() {
            return Err(EmailError::Config(
                "Mailgun domain and private key are required".to_string(),
            ));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| EmailError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!("{}/v3/{}/messages", api_base.trim_end_matches('/'), domain),
            api_key,
        })
    }

    fn form(message: &EmailMessage) -> Result<Vec<(&'static str, String)>, EmailError> {
        let mut form = vec![
            ("from", mailbox(&message.from)?.to_string()),
            ("h:Reply-To", mailbox(&message.reply_to)?.to_string()),
        ];
        form.extend(message.to.iter().map(|e| ("to", e.to_string())));
        form.extend(message.cc.iter().map(|e| ("cc", e.to_string())));
        form.extend(message.bcc.iter().map(|e| ("bcc", e.to_string())));
        form.push(("subject", message.subject.clone()));

        let body_field = if message.html { "html" } else { "text" };
        form.push((body_field, message.body.clone()));
        Ok(form)
    }
}

#[async_trait]
impl EmailProvider for MailgunMailer {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, EmailError> {
        tracing::debug!(
            to = message.to.len(),
            subject = %message.subject,
            "Sending email via Mailgun"
        );

        let form = Self::form(message)?;
        let response = self
            .client
            .post(&self.url)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| EmailError::Send(format!("Mailgun request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Provider(format!(
                "Mailgun error {}: {}",
                status,
                body.trim()
            )));
        }

        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| EmailError::Provider(format!("Invalid Mailgun response: {}", e)))?;

        Ok(Delivery {
            id: body.id,
            response: body.message,
        })
    }
}
