//! Blocking HTTP adapters for the object store and the intake endpoint.
//!
//! Both adapters surface every failure as a [`TransportFailure`] and never retry; callers
//! decide whether an ambiguous failure is safe to repeat.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use super::domain::FileUpload;
use super::submission::{ChecklistSubmission, IntakeEndpoint};
use super::upload::DocumentStore;

const MAX_ERROR_MESSAGE_CHARS: usize = 500;
const URL_FIELDS: [&str; 4] = ["url", "file_url", "fileUrl", "publicUrl"];
const MESSAGE_FIELDS: [&str; 4] = ["error", "message", "msg", "detail"];

/// Failure talking to a remote collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportFailure {
    #[error("network error: {0}")]
    Network(String),
    #[error("server responded with status {status}: {message}")]
    Server { status: u16, message: String },
    #[error("unreadable server response: {0}")]
    InvalidResponse(String),
}

/// Best available message for a failed response: a structured field, then the raw body,
/// then a generic fallback naming the status.
pub fn extract_error_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(message) = structured_message(&value) {
            return message;
        }
    }

    if !trimmed.is_empty() {
        return trimmed.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
    }

    format!("request failed with status {status}")
}

fn structured_message(value: &Value) -> Option<String> {
    for field in MESSAGE_FIELDS {
        match value.get(field) {
            Some(Value::String(message)) if !message.trim().is_empty() => {
                return Some(message.trim().to_string());
            }
            Some(nested @ Value::Object(_)) => {
                if let Some(message) = structured_message(nested) {
                    return Some(message);
                }
            }
            _ => {}
        }
    }
    None
}

/// Pull the canonical file URL out of an object-store success body.
pub(crate) fn parse_file_url(body: &str) -> Result<String, TransportFailure> {
    let value: Value = serde_json::from_str(body.trim())
        .map_err(|err| TransportFailure::InvalidResponse(err.to_string()))?;

    URL_FIELDS
        .iter()
        .filter_map(|field| value.get(field).and_then(Value::as_str))
        .map(str::trim)
        .find(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            TransportFailure::InvalidResponse("response did not include a file url".to_string())
        })
}

fn build_client(timeout: Duration) -> Result<Client, TransportFailure> {
    Client::builder()
        .connect_timeout(timeout.min(Duration::from_secs(15)))
        .timeout(timeout)
        .build()
        .map_err(|err| TransportFailure::Network(err.to_string()))
}

fn failure_from_response(response: Response) -> TransportFailure {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    TransportFailure::Server {
        status,
        message: extract_error_message(status, &body),
    }
}

/// Object store reached over HTTP: `PUT {base}/{key}` with the raw bytes.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    base_url: Url,
    client: Client,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportFailure> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|err| TransportFailure::Network(format!("invalid store url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportFailure::Network(format!(
                "invalid store url: {base_url}"
            )));
        }
        Ok(Self {
            base_url,
            client: build_client(timeout)?,
        })
    }

    fn object_url(&self, key: &str) -> Result<Url, TransportFailure> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportFailure::Network(format!("invalid store url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(key.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }
}

impl DocumentStore for HttpDocumentStore {
    fn put(
        &self,
        key: &str,
        file: &FileUpload,
        content_type: &str,
    ) -> Result<String, TransportFailure> {
        let url = self.object_url(key)?;
        debug!(%url, size = file.size(), "transmitting document");

        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(file.bytes.clone())
            .send()
            .map_err(|err| TransportFailure::Network(err.to_string()))?;

        if !response.status().is_success() {
            let failure = failure_from_response(response);
            warn!(key, error = %failure, "document store rejected upload");
            return Err(failure);
        }

        let body = response
            .text()
            .map_err(|err| TransportFailure::InvalidResponse(err.to_string()))?;
        parse_file_url(&body)
    }
}

/// Intake endpoint reached over HTTP: `POST {url}` with the checklist snapshot as JSON.
#[derive(Debug, Clone)]
pub struct HttpIntakeEndpoint {
    url: Url,
    client: Client,
}

impl HttpIntakeEndpoint {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, TransportFailure> {
        let url = Url::parse(url.trim())
            .map_err(|err| TransportFailure::Network(format!("invalid intake url: {err}")))?;
        Ok(Self {
            url,
            client: build_client(timeout)?,
        })
    }
}

impl IntakeEndpoint for HttpIntakeEndpoint {
    fn submit(&self, submission: &ChecklistSubmission) -> Result<(), TransportFailure> {
        let response = self
            .client
            .post(self.url.clone())
            .json(submission)
            .send()
            .map_err(|err| TransportFailure::Network(err.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(failure_from_response(response))
        }
    }
}
