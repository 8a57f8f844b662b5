use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

/// Keys the service uses for a human-readable error message, in lookup order.
const MESSAGE_KEYS: [&str; 3] = ["error", "detail", "message"];

/// Keys that may hold field-level validation detail.
const FIELD_ERROR_KEYS: [&str; 3] = ["errors", "field_errors", "details"];

/// Coarse classification of an [`Error`].
///
/// Every error falls into exactly one of these. `DocWal` is the catch-all
/// for other HTTP statuses and for network, timeout and decoding failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    Validation,
    RateLimit,
    DocWal,
}

/// Validation messages attached to one request field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub messages: Vec<String>,
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The API key is missing or invalid (401), or lacks permission (403).
    #[error("{message}")]
    Authentication {
        message: String,
        status: StatusCode,
        permission_denied: bool,
        body: String,
    },
    /// The payload was rejected by the server (400/422 with field detail),
    /// or failed a precondition before it was sent (`status` is `None`).
    #[error("{message}")]
    Validation {
        message: String,
        status: Option<StatusCode>,
        field_errors: Vec<FieldError>,
        body: Option<String>,
    },
    #[error("{message}")]
    RateLimit {
        message: String,
        retry_after: Option<Duration>,
        body: String,
    },
    /// Any other non-2xx response.
    #[error("{message}")]
    Api {
        message: String,
        status: StatusCode,
        body: String,
    },
    #[error("request timed out after {after:?}")]
    Timeout {
        after: Duration,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to connect to {base_url}")]
    Connection {
        base_url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request failed")]
    Request(#[source] reqwest::Error),
    #[error("could not decode response (HTTP {status})")]
    Decode {
        status: StatusCode,
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization error")]
    Serialization(#[from] serde_json::Error),
    #[error("could not read upload")]
    Io(#[from] std::io::Error),
    #[error("invalid URL")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Maps a non-2xx response to an error.
    ///
    /// `retry_after` is the raw `Retry-After` header value, if any.
    pub fn from_response(status: StatusCode, retry_after: Option<&str>, body: &[u8]) -> Error {
        let text = String::from_utf8_lossy(body).into_owned();
        let json: Option<Value> = serde_json::from_slice(body).ok();
        let message = json.as_ref().and_then(body_message);

        match status.as_u16() {
            401 => Error::Authentication {
                message: message.unwrap_or_else(|| "Invalid API key".to_string()),
                status,
                permission_denied: false,
                body: text,
            },
            403 => Error::Authentication {
                message: message.unwrap_or_else(|| "Permission denied".to_string()),
                status,
                permission_denied: true,
                body: text,
            },
            400 | 422 => {
                let field_errors = json.as_ref().map(field_errors).unwrap_or_default();
                if field_errors.is_empty() {
                    return Error::Api {
                        message: message.unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
                        status,
                        body: text,
                    };
                }

                Error::Validation {
                    message: message.unwrap_or_else(|| "Validation failed".to_string()),
                    status: Some(status),
                    field_errors,
                    body: Some(text),
                }
            }
            429 => Error::RateLimit {
                message: message.unwrap_or_else(|| "Rate limit exceeded".to_string()),
                retry_after: retry_after
                    .and_then(parse_retry_after)
                    .or_else(|| json.as_ref().and_then(body_retry_after)),
                body: text,
            },
            code => Error::Api {
                message: message.unwrap_or_else(|| format!("HTTP {code}")),
                status,
                body: text,
            },
        }
    }

    /// Classifies a failure that happened before a response was received.
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration, base_url: &str) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                after: timeout,
                source: err,
            }
        } else if err.is_connect() {
            Error::Connection {
                base_url: base_url.to_string(),
                source: err,
            }
        } else {
            Error::Request(err)
        }
    }

    /// A validation failure detected before any request was sent.
    pub(crate) fn precondition(field: &str, message: impl Into<String>) -> Error {
        let message = message.into();
        Error::Validation {
            field_errors: vec![FieldError {
                field: field.to_string(),
                messages: vec![message.clone()],
            }],
            message,
            status: None,
            body: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::RateLimit { .. } => ErrorKind::RateLimit,
            _ => ErrorKind::DocWal,
        }
    }

    /// The server's message for response errors, or the display text otherwise.
    pub fn message(&self) -> String {
        match self {
            Error::Authentication { message, .. }
            | Error::Validation { message, .. }
            | Error::RateLimit { message, .. }
            | Error::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// The HTTP status of the response that caused this error, if there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Authentication { status, .. }
            | Error::Api { status, .. }
            | Error::Decode { status, .. } => Some(*status),
            Error::Validation { status, .. } => *status,
            Error::RateLimit { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            Error::Timeout { source, .. }
            | Error::Connection { source, .. }
            | Error::Request(source) => source.status(),
            _ => None,
        }
    }

    /// Raw response body, for diagnostics.
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::Authentication { body, .. }
            | Error::RateLimit { body, .. }
            | Error::Api { body, .. }
            | Error::Decode { body, .. } => Some(body),
            Error::Validation { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Error::Validation { field_errors, .. } => field_errors,
            _ => &[],
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// True for failures where no response was received at all.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::Connection { .. } | Error::Request(_))
    }
}

fn body_message(body: &Value) -> Option<String> {
    let obj = body.as_object()?;
    MESSAGE_KEYS.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(inner) => inner.get("message")?.as_str().map(str::to_string),
        _ => None,
    })
}

fn body_retry_after(body: &Value) -> Option<Duration> {
    let secs = body.get("retry_after")?;
    secs.as_u64()
        .map(Duration::from_secs)
        .or_else(|| Duration::try_from_secs_f64(secs.as_f64()?).ok())
}

/// Accepts both `Retry-After` forms: delta seconds, or an HTTP date.
fn parse_retry_after(header: &str) -> Option<Duration> {
    let header = header.trim();
    if let Ok(secs) = header.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let at = DateTime::parse_from_rfc2822(header).ok()?.with_timezone(&Utc);
    Some((at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}

/// Finds field-level validation detail in an error body.
///
/// Accepts a map or list under one of [`FIELD_ERROR_KEYS`], or a bare
/// `{"field": ["message", ...]}` body.
fn field_errors(body: &Value) -> Vec<FieldError> {
    let Some(obj) = body.as_object() else {
        return Vec::new();
    };

    for key in FIELD_ERROR_KEYS {
        let found = match obj.get(key) {
            Some(Value::Object(map)) => from_map(map),
            Some(Value::Array(items)) => from_list(items),
            _ => continue,
        };
        if !found.is_empty() {
            return found;
        }
    }

    obj.iter()
        .filter(|(key, _)| !MESSAGE_KEYS.contains(&key.as_str()) && key.as_str() != "code")
        .filter_map(|(key, value)| match value {
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_string) => {
                Some(FieldError {
                    field: key.clone(),
                    messages: messages(value),
                })
            }
            _ => None,
        })
        .collect()
}

fn from_map(map: &Map<String, Value>) -> Vec<FieldError> {
    map.iter()
        .map(|(field, value)| FieldError {
            field: field.clone(),
            messages: messages(value),
        })
        .filter(|err| !err.messages.is_empty())
        .collect()
}

fn from_list(items: &[Value]) -> Vec<FieldError> {
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let field = obj.get("field")?.as_str()?;
            let msgs = messages(obj.get("message").or_else(|| obj.get("messages"))?);
            Some(FieldError {
                field: field.to_string(),
                messages: msgs,
            })
        })
        .collect()
}

fn messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(messages).collect(),
        Value::Object(obj) => match obj.get("message") {
            Some(msg) => messages(msg),
            None => obj.values().flat_map(messages).collect(),
        },
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}
