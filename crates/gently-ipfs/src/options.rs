//! Per-call pin options
//!
//! Built with chained setters, resolved once when the call starts.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Pin kinds as the daemon names them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PinType {
    /// Only the named node
    Direct,
    /// Reachable from some recursive pin
    Indirect,
    /// The root and everything under it
    Recursive,
    /// Any of the above (listing filter only)
    #[default]
    All,
}

impl PinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinType::Direct => "direct",
            PinType::Indirect => "indirect",
            PinType::Recursive => "recursive",
            PinType::All => "all",
        }
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PinType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "direct" => Ok(PinType::Direct),
            "indirect" => Ok(PinType::Indirect),
            "recursive" => Ok(PinType::Recursive),
            "all" => Ok(PinType::All),
            other => Err(Error::Config(format!(
                "invalid pin type {:?}, expected direct, indirect, recursive or all",
                other
            ))),
        }
    }
}

/// Options for `pin/add`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAddOptions {
    recursive: bool,
}

impl PinAddOptions {
    pub fn new() -> Self {
        Self { recursive: true }
    }

    /// Pin the whole DAG (default) or only the named node
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }
}

impl Default for PinAddOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for `pin/ls`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PinLsOptions {
    filter: PinType,
    // Raw filter that failed to parse, reported when the call resolves
    invalid: Option<String>,
}

impl PinLsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin_type(mut self, filter: PinType) -> Self {
        self.filter = filter;
        self.invalid = None;
        self
    }

    /// Set the filter from its string form; an unknown name fails the call
    pub fn type_filter(mut self, filter: &str) -> Self {
        match filter.parse::<PinType>() {
            Ok(parsed) => {
                self.filter = parsed;
                self.invalid = None;
            }
            Err(_) => self.invalid = Some(filter.to_string()),
        }
        self
    }

    /// Settle the options into the filter actually sent
    pub fn resolve(&self) -> Result<PinType> {
        match &self.invalid {
            Some(raw) => raw.parse(),
            None => Ok(self.filter),
        }
    }
}

/// Options for `pin/update`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinUpdateOptions {
    unpin: bool,
}

impl PinUpdateOptions {
    pub fn new() -> Self {
        Self { unpin: true }
    }

    /// Drop the old pin once the new one is in place (default)
    pub fn unpin(mut self, unpin: bool) -> Self {
        self.unpin = unpin;
        self
    }

    pub fn is_unpin(&self) -> bool {
        self.unpin
    }
}

impl Default for PinUpdateOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert!(PinAddOptions::default().is_recursive());
        assert!(PinUpdateOptions::default().is_unpin());
        assert_eq!(PinLsOptions::default().resolve().unwrap(), PinType::All);
    }

    #[test]
    fn test_type_filter_parsing() {
        let opts = PinLsOptions::new().type_filter("indirect");
        assert_eq!(opts.resolve().unwrap(), PinType::Indirect);

        let bad = PinLsOptions::new().type_filter("sideways");
        assert!(matches!(bad.resolve(), Err(Error::Config(_))));

        // A later valid setting clears the earlier mistake
        let fixed = bad.pin_type(PinType::Direct);
        assert_eq!(fixed.resolve().unwrap(), PinType::Direct);
    }

    #[test]
    fn test_pin_type_strings() {
        for t in [PinType::Direct, PinType::Indirect, PinType::Recursive, PinType::All] {
            assert_eq!(t.as_str().parse::<PinType>().unwrap(), t);
        }
    }
}
