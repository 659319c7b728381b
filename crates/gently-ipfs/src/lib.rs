//! GentlyOS IPFS Operations
//!
//! They spend, we gather.
//! A thin client for the IPFS daemon's HTTP API: every call becomes one
//! `POST /api/v0/<command>` and every answer is decoded into a typed value.
//!
//! ```text
//!   IpfsClient ──pin()──▶ PinApi ── add / ls / rm / update / verify
//!       │
//!       └── Arc<dyn Transport> ── HttpTransport (reqwest) ──▶ daemon
//! ```

pub mod client;
pub mod config;
pub mod options;
pub mod path;
pub mod pinning;
pub mod request;
pub mod transport;

pub use client::IpfsClient;
pub use config::ApiConfig;
pub use options::{PinAddOptions, PinLsOptions, PinType, PinUpdateOptions};
pub use path::{ContentPath, ResolvedPath};
pub use pinning::{BadPinNode, Pin, PinApi, PinStatus, VerifyOutcome, VerifyStream};
pub use request::RequestBuilder;
pub use transport::{HttpTransport, Request, Response, Transport};

pub use tokio_util::sync::CancellationToken;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IPFS connection failed: {0}")]
    ConnectionFailed(String),

    /// Failure reported by the daemon, message passed through as-is
    #[error("{0}")]
    Remote(String),

    #[error("Invalid CID {cid:?}: {source}")]
    InvalidCid {
        cid: String,
        #[source]
        source: cid::Error,
    },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parse a CID string, keeping the offending input in the error
pub(crate) fn parse_cid(s: &str) -> Result<cid::Cid> {
    s.parse::<cid::Cid>().map_err(|source| Error::InvalidCid {
        cid: s.to_string(),
        source,
    })
}
