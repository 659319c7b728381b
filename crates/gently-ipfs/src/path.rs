//! Content paths
//!
//! `ContentPath` is what callers hand to the daemon (it may still need
//! resolving); `ResolvedPath` is what the daemon hands back: a bare CID.

use crate::{parse_cid, Error, Result};
use cid::Cid;
use std::fmt;

const NAMESPACES: [&str; 3] = ["ipfs", "ipns", "ipld"];

/// A path the daemon knows how to resolve (`/ipfs/<cid>/a/b`, `/ipns/<name>`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentPath(String);

impl ContentPath {
    /// Parse a namespaced path or a bare CID (optionally followed by `/sub/path`)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidPath("empty path".into()));
        }

        if let Some(rest) = s.strip_prefix('/') {
            let (namespace, remainder) = rest.split_once('/').unwrap_or((rest, ""));
            if !NAMESPACES.contains(&namespace) {
                return Err(Error::InvalidPath(format!("unknown namespace in {:?}", s)));
            }
            if remainder.trim_matches('/').is_empty() {
                return Err(Error::InvalidPath(format!("nothing after /{}/", namespace)));
            }
            return Ok(Self(s.to_string()));
        }

        // Bare CID, maybe with a trailing sub path
        let (root, sub) = match s.split_once('/') {
            Some((root, sub)) => (root, Some(sub)),
            None => (s, None),
        };
        let cid = parse_cid(root)
            .map_err(|e| Error::InvalidPath(format!("{:?} is not a CID: {}", s, e)))?;

        Ok(match sub {
            Some(sub) if !sub.is_empty() => Self(format!("/ipfs/{}/{}", cid, sub)),
            _ => Self(format!("/ipfs/{}", cid)),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ContentPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<ResolvedPath> for ContentPath {
    fn from(path: ResolvedPath) -> Self {
        Self(path.to_string())
    }
}

/// A path already resolved down to a single IPLD node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedPath {
    cid: Cid,
}

impl ResolvedPath {
    pub fn new(cid: Cid) -> Self {
        Self { cid }
    }

    /// Resolve straight from a CID string
    pub fn from_cid_str(s: &str) -> Result<Self> {
        parse_cid(s).map(Self::new)
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/ipld/{}", self.cid)
    }
}
