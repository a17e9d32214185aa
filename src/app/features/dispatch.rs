//! The form endpoint: validate a submission, render it, hand it to the
//! provider and record the outcome.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRequest, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
    Form,
};
use time::OffsetDateTime;

use crate::app::{
    audit::{AuditLog, AuditLogConfig},
    compose::{Message, MessageComposer},
    config::Config,
    domain::{Email, FormValues},
    error::{ConfigError, Envelope, RequestError},
    mail::{EmailError, EmailMessage, EmailProvider},
    rate_limit::RateLimiter,
    template::CompiledTemplates,
    AppState,
};

/// Deadline for one provider submission.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the endpoint needs, built once at startup and shared read-only.
pub struct Dispatcher {
    config: Config,
    composer: MessageComposer,
    audit: AuditLog,
    limiter: RateLimiter,
    mail: Arc<dyn EmailProvider>,
    send_timeout: Duration,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("endpoint", &self.config.endpoint)
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Compile templates, open the audit channels and build the rate limiter.
    pub fn from_config(config: &Config, mail: Arc<dyn EmailProvider>) -> Result<Self, ConfigError> {
        let templates = CompiledTemplates::load(&config.subject, &config.body_path)?;
        let audit = AuditLogConfig::new(config.mail_log.as_str(), config.error_log.as_str())
            .init(config.hosts.as_slice())?;

        Ok(Self {
            config: config.clone(),
            composer: MessageComposer::new(config, templates),
            audit,
            limiter: RateLimiter::new(config.rate_limit_capacity, config.rate_limit_interval),
            mail,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        })
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Handle a request addressed to the endpoint.
    pub async fn handle(&self, request: Request) -> Response {
        match self.accept(request).await {
            Ok(form) => self.deliver(form).await,
            Err(err) => err.into_response(),
        }
    }

    /// Checks run in order; the first failure decides the response.
    async fn accept(&self, request: Request) -> Result<FormValues, RequestError> {
        if request.method() != Method::POST {
            return Err(RequestError::MethodNotAllowed);
        }

        if !self.limiter.try_acquire() {
            return Err(RequestError::RateLimited);
        }

        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .map_err(|rejection| RequestError::Form(rejection.body_text()))?;
        let form: FormValues = pairs.into_iter().collect();

        let email = form.first("email").unwrap_or_default();
        if Email::new(email).is_err() {
            return Err(RequestError::InvalidEmail(email.to_string()));
        }

        Ok(form)
    }

    /// Compose and submit. The caller gets 200 whether or not the provider
    /// accepted the message; failures only reach the error channel.
    async fn deliver(&self, form: FormValues) -> Response {
        let message = self.composer.compose(&form, &self.audit);
        let outgoing = EmailMessage::new(&message, &self.config, self.composer.body_is_markup());

        let sent = tokio::time::timeout(self.send_timeout, self.mail.send(&outgoing))
            .await
            .unwrap_or(Err(EmailError::Timeout(self.send_timeout)));

        match sent {
            Ok(delivery) => {
                self.record_sent(&message);
                tracing::info!(
                    id = %delivery.id,
                    response = %delivery.response,
                    to = %message.to,
                    subject = %message.subject,
                    "Email dispatched"
                );
            }
            Err(err) => {
                self.audit
                    .write_error(format_args!("Failed to send email: {}", err));
                tracing::warn!(%err, "Email delivery failed");
            }
        }

        Envelope::ok().into_response()
    }

    fn record_sent(&self, message: &Message) {
        let record = message.audit_record(OffsetDateTime::now_utc());
        let mut writer = self.audit.mail_writer();
        if let Err(err) = writer.write_all(record.as_bytes()) {
            tracing::warn!(%err, "failed to buffer mail log record");
            return;
        }
        if let Err(err) = writer.close() {
            tracing::warn!(%err, "failed to write mail log record");
        }
    }
}

/// Middleware intercepting the configured endpoint. Every other path goes
/// to the next service untouched.
pub async fn dispatch(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.uri().path() != state.dispatcher.endpoint() {
        return next.run(request).await;
    }
    state.dispatcher.handle(request).await
}
