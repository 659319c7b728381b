//! HTTP transport
//!
//! The seam between the typed API and the wire. `HttpTransport` talks to a real
//! daemon; anything else implementing `Transport` can stand in for it.

use crate::{ApiConfig, Error, Result};
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

/// One API command, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command path relative to `/api/v0/`, e.g. `pin/add`
    pub command: String,
    /// Positional arguments, sent as repeated `arg=` pairs in order
    pub arguments: Vec<String>,
    /// Named options, sent after the arguments
    pub options: Vec<(String, String)>,
}

impl Request {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            arguments: Vec::new(),
            options: Vec::new(),
        }
    }

    /// Query pairs in wire order
    pub fn query(&self) -> Vec<(&str, &str)> {
        self.arguments
            .iter()
            .map(|a| ("arg", a.as_str()))
            .chain(self.options.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .collect()
    }

    /// First value of a named option
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A successful response. Dropping it releases the connection.
pub struct Response {
    pub output: Box<dyn AsyncRead + Send + Unpin>,
}

impl Response {
    pub fn new(output: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            output: Box::new(output),
        }
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response").finish_non_exhaustive()
    }
}

/// Sends requests to the daemon
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. A daemon-reported failure is `Error::Remote`.
    async fn send(&self, request: Request) -> Result<Response>;
}

/// Error body the daemon sends with non-2xx statuses
#[derive(Debug, Deserialize)]
struct DaemonError {
    #[serde(rename = "Message")]
    message: String,
}

/// reqwest-backed transport
pub struct HttpTransport {
    http: reqwest::Client,
    config: ApiConfig,
}

impl HttpTransport {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("header {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("header {:?}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::ConnectionFailed(e.to_string()))?;

        Ok(Self { http, config })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let url = self.config.endpoint(&request.command);

        let response = self
            .http
            .post(&url)
            .query(&request.query())
            .send()
            .await
            .map_err(|e| Error::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| Error::ConnectionFailed(e.to_string()))?;
            tracing::debug!("{} failed with {}: {}", request.command, status, body);

            let message = match serde_json::from_str::<DaemonError>(&body) {
                Ok(err) => err.message,
                Err(_) if body.trim().is_empty() => status.to_string(),
                Err(_) => body.trim().to_string(),
            };
            return Err(Error::Remote(message));
        }

        let body = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));

        Ok(Response::new(StreamReader::new(Box::pin(body))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_order() {
        let mut request = Request::new("pin/update");
        request.arguments.push("/ipfs/a".into());
        request.arguments.push("/ipfs/b".into());
        request.options.push(("unpin".into(), "false".into()));

        assert_eq!(
            request.query(),
            vec![("arg", "/ipfs/a"), ("arg", "/ipfs/b"), ("unpin", "false")]
        );
        assert_eq!(request.option("unpin"), Some("false"));
        assert_eq!(request.option("recursive"), None);
    }

    #[test]
    fn test_bad_header_is_config_error() {
        let mut config = ApiConfig::default();
        config.headers.insert("bad header".into(), "x".into());
        assert!(matches!(HttpTransport::new(config), Err(Error::Config(_))));
    }
}
