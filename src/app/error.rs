use std::path::PathBuf;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Content type of every envelope written by the dispatch endpoint.
pub const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Errors raised while loading configuration. All of them abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The following {} required and cannot be empty: {}", missing_noun(.0), .0.join(", "))]
    MissingProperties(Vec<&'static str>),

    #[error("{key} contains an invalid email address: {value:?}")]
    InvalidEmail { key: &'static str, value: String },

    #[error("{key} is invalid: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("File {0:?} not found")]
    FileNotFound(PathBuf),

    #[error("Unsupported template extension {extension:?} for {path:?}: only .txt and .html are accepted")]
    UnsupportedExtension { extension: String, path: PathBuf },

    #[error("File {path:?} is not readable: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template {name:?} failed to parse: {message}")]
    TemplateParse { name: String, message: String },

    #[error("Cannot create directory {dir:?} because of: {source}")]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open log file {path:?}: {source}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn missing_noun(missing: &[&'static str]) -> &'static str {
    if missing.len() > 1 {
        "properties are"
    } else {
        "property is"
    }
}

/// JSON body of every dispatch response.
/// Code 200 and an empty error mean success; any other code is an error.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    #[serde(skip_serializing_if = "is_zero")]
    pub code: u16,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

fn is_zero(code: &u16) -> bool {
    *code == 0
}

impl Envelope {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            error: String::new(),
        }
    }

    pub fn error(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            error: error.into(),
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK);

        let mut body = match serde_json::to_vec(&self) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(%err, "failed to encode response envelope");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        body.push(b'\n');

        let mut response = (status, body).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
        response
    }
}

/// Per-request failures. Reported to the caller, never logged as server faults.
#[derive(Debug)]
pub enum RequestError {
    /// Anything other than POST on the endpoint (405)
    MethodNotAllowed,

    /// Rate limiter bucket is empty (429)
    RateLimited,

    /// Body could not be parsed as a form (400)
    Form(String),

    /// Missing or malformed `email` field; holds the submitted value (422)
    InvalidEmail(String),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RequestError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RequestError::Form(_) => StatusCode::BAD_REQUEST,
            RequestError::InvalidEmail(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            RequestError::MethodNotAllowed | RequestError::RateLimited => status
                .canonical_reason()
                .unwrap_or_default()
                .to_string(),
            RequestError::Form(msg) => msg,
            RequestError::InvalidEmail(value) => format!("Invalid email address: {:?}", value),
        };

        Envelope::error(status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_properties_message() {
        let one = ConfigError::MissingProperties(vec!["domain"]);
        assert_eq!(
            one.to_string(),
            "The following property is required and cannot be empty: domain"
        );

        let two = ConfigError::MissingProperties(vec!["domain", "privatekey"]);
        assert_eq!(
            two.to_string(),
            "The following properties are required and cannot be empty: domain, privatekey"
        );
    }

    #[test]
    fn envelope_omits_empty_fields() {
        assert_eq!(serde_json::to_string(&Envelope::ok()).unwrap(), r#"{"code":200}"#);
        assert_eq!(serde_json::to_string(&Envelope::default()).unwrap(), "{}");
    }

    #[test]
    fn request_error_status_and_content_type() {
        let response = RequestError::InvalidEmail("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            JSON_UTF8
        );

        let response = RequestError::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
