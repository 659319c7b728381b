//! Request builder
//!
//! `client.request("pin/add").argument(path).option("recursive", true).exec_empty()`

use crate::transport::{Request, Response, Transport};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

pub struct RequestBuilder {
    transport: Arc<dyn Transport>,
    request: Request,
}

impl RequestBuilder {
    pub(crate) fn new(transport: Arc<dyn Transport>, command: &str) -> Self {
        Self {
            transport,
            request: Request::new(command),
        }
    }

    /// Append a positional argument
    pub fn argument(mut self, arg: impl Display) -> Self {
        self.request.arguments.push(arg.to_string());
        self
    }

    /// Set a named option
    pub fn option(mut self, key: &str, value: impl Display) -> Self {
        self.request.options.push((key.to_string(), value.to_string()));
        self
    }

    /// Send and hand back the raw body
    pub async fn send(self) -> Result<Response> {
        tracing::debug!(
            "IPFS request {} ({} args, {} options)",
            self.request.command,
            self.request.arguments.len(),
            self.request.options.len()
        );
        self.transport.send(self.request).await
    }

    /// Send and decode a single JSON object
    pub async fn exec<T: DeserializeOwned>(self) -> Result<T> {
        let command = self.request.command.clone();
        let mut response = self.send().await?;

        let mut body = Vec::new();
        response
            .output
            .read_to_end(&mut body)
            .await
            .map_err(|e| Error::ConnectionFailed(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| Error::Decode(format!("{}: {}", command, e)))
    }

    /// Send and ignore whatever comes back
    pub async fn exec_empty(self) -> Result<()> {
        let mut response = self.send().await?;
        tokio::io::copy(&mut response.output, &mut tokio::io::sink())
            .await
            .map_err(|e| Error::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}
