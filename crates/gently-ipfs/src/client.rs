//! IPFS client
//!
//! Owns the transport; every API family borrows it.

use crate::pinning::PinApi;
use crate::request::RequestBuilder;
use crate::transport::{HttpTransport, Transport};
use crate::{ApiConfig, Result};
use std::sync::Arc;

/// Handle to one daemon. Cheap to clone.
#[derive(Clone)]
pub struct IpfsClient {
    transport: Arc<dyn Transport>,
}

impl IpfsClient {
    /// Client over HTTP for the given config
    pub fn new(config: ApiConfig) -> Result<Self> {
        tracing::debug!("IPFS API at {}", config.api_url);
        Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
    }

    /// Client for the local daemon, see [`ApiConfig::discover`]
    pub fn local() -> Result<Self> {
        Self::new(ApiConfig::discover()?)
    }

    /// Client over any transport
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Start a raw API request
    pub fn request(&self, command: &str) -> RequestBuilder {
        RequestBuilder::new(self.transport.clone(), command)
    }

    /// Pin management
    pub fn pin(&self) -> PinApi<'_> {
        PinApi::new(self)
    }
}

impl std::fmt::Debug for IpfsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpfsClient").finish_non_exhaustive()
    }
}
