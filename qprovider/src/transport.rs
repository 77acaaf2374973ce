//! Blocking SSE transport trait and reqwest-based HTTP implementation.

use std::io::{BufRead, BufReader, Lines};
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;

use crate::ProviderError;

/// A single vendor wire call: URL, headers, JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl WireRequest {
    pub fn new(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Yields the payload of each SSE `data:` line, in wire order.
pub type BoxedPayloadIterator = Box<dyn Iterator<Item = Result<String, ProviderError>> + Send>;

pub trait StreamTransport: Send + Sync {
    fn open(&self, request: WireRequest) -> Result<BoxedPayloadIterator, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct HttpStreamTransport {
    client: Client,
}

impl HttpStreamTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ProviderError::transport(error.to_string()))?;
        Ok(Self::new(client))
    }

    fn parse_error(response: Response) -> ProviderError {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("vendor request failed with status {status}"));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::authentication(message)
            }
            StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                ProviderError::timeout(message)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ProviderError::invalid_request(message)
            }
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                ProviderError::unavailable(message)
            }
            _ => ProviderError::transport(message),
        }
    }
}

impl StreamTransport for HttpStreamTransport {
    fn open(&self, request: WireRequest) -> Result<BoxedPayloadIterator, ProviderError> {
        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().map_err(|error| {
            if error.is_timeout() {
                ProviderError::timeout(error.to_string())
            } else {
                ProviderError::transport(error.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response));
        }

        Ok(Box::new(SsePayloadIterator::new(response)))
    }
}

/// Reads an event-stream body line by line and surfaces `data:` payloads.
/// Non-data lines (event names, comments, blank separators) are skipped.
struct SsePayloadIterator {
    lines: Lines<BufReader<Response>>,
}

impl SsePayloadIterator {
    fn new(response: Response) -> Self {
        Self {
            lines: BufReader::new(response).lines(),
        }
    }
}

impl Iterator for SsePayloadIterator {
    type Item = Result<String, ProviderError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    let line = line.trim();
                    if let Some(payload) = line.strip_prefix("data:") {
                        return Some(Ok(payload.trim().to_string()));
                    }
                }
                Some(Err(error)) => {
                    return Some(Err(ProviderError::transport(error.to_string())));
                }
                None => return None,
            }
        }
    }
}

pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok()?;
    Some(parsed.error.message)
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
