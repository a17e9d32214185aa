#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use formmail::app::{
    config::Config,
    features::dispatch::Dispatcher,
    mail::{Delivery, EmailError, EmailMessage, EmailProvider},
    AppState,
};
use formmail::create_router;
use http_body_util::BodyExt;

/// Captures every message handed to it.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailProvider for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, EmailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(Delivery {
            id: "<test@example.com>".to_string(),
            response: "Queued".to_string(),
        })
    }
}

/// Rejects every message.
pub struct FailingMailer;

#[async_trait]
impl EmailProvider for FailingMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<Delivery, EmailError> {
        Err(EmailError::Provider("Mailgun error 401: Forbidden".to_string()))
    }
}

/// Never answers within any reasonable deadline.
pub struct SlowMailer;

#[async_trait]
impl EmailProvider for SlowMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<Delivery, EmailError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Delivery::default())
    }
}

/// Test config writing both audit channels into `dir`, with the body
/// template `body.<extension>` created there.
pub fn test_config(dir: &Path, extension: &str, body: &str) -> Config {
    let body_path = dir.join(format!("body.{}", extension));
    std::fs::write(&body_path, body).unwrap();

    let mut config = Config::for_tests();
    config.body_path = body_path;
    config.mail_log = dir.to_str().unwrap().to_string();
    config.error_log = dir.to_str().unwrap().to_string();
    config.subject = "Contact from {{ Form.name | first }}".to_string();
    config
}

pub fn test_dispatcher(config: &Config, mail: Arc<dyn EmailProvider>) -> Dispatcher {
    Dispatcher::from_config(config, mail).unwrap()
}

pub fn test_router(dispatcher: Dispatcher) -> (axum::Router, AppState) {
    let state = AppState::new(dispatcher);
    (create_router(state.clone()), state)
}

pub fn contact_form_body(email: &str, name: &str, message: &str) -> String {
    format!(
        "email={}&name={}&message={}",
        urlencoding::encode(email),
        urlencoding::encode(name),
        urlencoding::encode(message)
    )
}

pub fn form_request(method: &str, uri: &str, body: String) -> http::Request<Body> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

pub async fn read_envelope(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn read_log(path: Option<&Path>) -> String {
    path.map(|p| std::fs::read_to_string(p).unwrap_or_default())
        .unwrap_or_default()
}
