//! API endpoint configuration
//!
//! Where the daemon lives and what to send along with every request.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5001";

/// Environment variable overriding the API address (URL or multiaddr)
pub const ENV_API: &str = "IPFS_API";
/// Environment variable pointing at the IPFS repo
pub const ENV_IPFS_PATH: &str = "IPFS_PATH";

/// Client-side view of the daemon's HTTP API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, without the `/api/v0` suffix
    pub api_url: String,
    /// Extra headers (e.g. `Authorization` for a remote node)
    pub headers: BTreeMap<String, String>,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            headers: BTreeMap::new(),
            user_agent: concat!("gently-ipfs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ApiConfig {
    /// Config for a known address (`http://host:port` or a multiaddr)
    pub fn with_address(address: &str) -> Result<Self> {
        let api_url = if address.starts_with('/') {
            multiaddr_to_url(address)?
        } else if address.starts_with("http://") || address.starts_with("https://") {
            address.trim_end_matches('/').to_string()
        } else {
            return Err(Error::Config(format!("unsupported API address {:?}", address)));
        };

        Ok(Self {
            api_url,
            ..Default::default()
        })
    }

    /// Config from a multiaddr such as `/ip4/127.0.0.1/tcp/5001`
    pub fn from_multiaddr(addr: &str) -> Result<Self> {
        Ok(Self {
            api_url: multiaddr_to_url(addr)?,
            ..Default::default()
        })
    }

    /// Load a YAML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Find the local daemon: `$IPFS_API`, then the repo's `api` file, then the default
    pub fn discover() -> Result<Self> {
        if let Ok(address) = std::env::var(ENV_API) {
            if !address.trim().is_empty() {
                tracing::debug!("Using IPFS API from ${}: {}", ENV_API, address);
                return Self::with_address(address.trim());
            }
        }

        if let Some(repo) = repo_path() {
            if let Some(config) = Self::from_repo(&repo)? {
                return Ok(config);
            }
        }

        Ok(Self::default())
    }

    /// Read `<repo>/api`, written by a running daemon. `None` if it isn't there.
    pub fn from_repo(repo: &Path) -> Result<Option<Self>> {
        let api_file = repo.join("api");
        match std::fs::read_to_string(&api_file) {
            Ok(contents) => {
                tracing::debug!("Using IPFS API from {}", api_file.display());
                Self::from_multiaddr(contents.trim()).map(Some)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Full endpoint URL for a command
    pub fn endpoint(&self, command: &str) -> String {
        format!("{}/api/v0/{}", self.api_url.trim_end_matches('/'), command)
    }
}

fn repo_path() -> Option<PathBuf> {
    match std::env::var_os(ENV_IPFS_PATH) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => dirs::home_dir().map(|home| home.join(".ipfs")),
    }
}

fn multiaddr_to_url(addr: &str) -> Result<String> {
    let invalid = || Error::Config(format!("unsupported API multiaddr {:?}", addr));

    let parts: Vec<&str> = addr.trim().trim_start_matches('/').split('/').collect();
    let (proto, host, transport, port, rest) = match parts.as_slice() {
        [proto, host, transport, port, rest @ ..] => (*proto, *host, *transport, *port, rest),
        _ => return Err(invalid()),
    };

    if transport != "tcp" || port.parse::<u16>().is_err() || host.is_empty() {
        return Err(invalid());
    }

    let scheme = match rest {
        [] | ["http"] => "http",
        ["https"] => "https",
        _ => return Err(invalid()),
    };

    let host = match proto {
        "ip4" | "dns" | "dns4" | "dns6" => host.to_string(),
        "ip6" => format!("[{}]", host),
        _ => return Err(invalid()),
    };

    Ok(format!("{}://{}:{}", scheme, host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiaddr_forms() {
        assert_eq!(
            ApiConfig::from_multiaddr("/ip4/127.0.0.1/tcp/5001").unwrap().api_url,
            "http://127.0.0.1:5001"
        );
        assert_eq!(
            ApiConfig::from_multiaddr("/ip6/::1/tcp/5001").unwrap().api_url,
            "http://[::1]:5001"
        );
        assert_eq!(
            ApiConfig::from_multiaddr("/dns4/node.example/tcp/443/https").unwrap().api_url,
            "https://node.example:443"
        );
    }

    #[test]
    fn test_bad_multiaddrs() {
        for addr in [
            "",
            "/ip4/127.0.0.1",
            "/ip4/127.0.0.1/udp/5001",
            "/ip4/1.2.3.4/tcp/99999",
            "/unix/tmp/sock/tcp/1",
        ] {
            assert!(
                matches!(ApiConfig::from_multiaddr(addr), Err(Error::Config(_))),
                "{} should be rejected",
                addr
            );
        }
    }

    #[test]
    fn test_with_address() {
        let cfg = ApiConfig::with_address("http://10.0.0.2:5001/").unwrap();
        assert_eq!(cfg.endpoint("pin/ls"), "http://10.0.0.2:5001/api/v0/pin/ls");

        assert!(ApiConfig::with_address("10.0.0.2:5001").is_err());
    }

    #[test]
    fn test_repo_api_file() {
        let repo = tempfile::tempdir().unwrap();
        assert!(ApiConfig::from_repo(repo.path()).unwrap().is_none());

        std::fs::write(repo.path().join("api"), "/ip4/127.0.0.1/tcp/45001\n").unwrap();
        let cfg = ApiConfig::from_repo(repo.path()).unwrap().unwrap();
        assert_eq!(cfg.api_url, "http://127.0.0.1:45001");
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("ipfs.yaml");
        std::fs::write(
            &file,
            "api_url: https://pin.example:5001\nheaders:\n  Authorization: Bearer abc\n",
        )
        .unwrap();

        let cfg = ApiConfig::load(&file).unwrap();
        assert_eq!(cfg.api_url, "https://pin.example:5001");
        assert_eq!(cfg.headers.get("Authorization").map(String::as_str), Some("Bearer abc"));
        assert_eq!(cfg.user_agent, ApiConfig::default().user_agent);
    }
}
